fn main() {
    if let Err(err) = nn_layout_engine::run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}
