fn main() {
    match readycheck::cli::run() {
        Ok(code) => std::process::exit(code.as_i32()),
        Err(err) => {
            readycheck::ui::eprintln_error(&err);
            std::process::exit(readycheck::exit::exit_code(&err));
        }
    }
}
