fn main() {
    if let Err(err) = resto_till_lib::run() {
        eprintln!("resto-till: {err}");
        std::process::exit(1);
    }
}
