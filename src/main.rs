fn main() {
    if let Err(err) = churn_segments::run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}
