fn main() {
    if let Err(err) = object_import::run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}
