fn main() {
    if let Err(err) = assistwear_lib::run() {
        log::error!("AssistWear stopped: {err:?}");
        eprintln!("assistwear: {err:#}");
        std::process::exit(1);
    }
}
