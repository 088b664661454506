use std::env;
use std::io;

fn main() {
    env_logger::init();

    let argv: Vec<String> = env::args().skip(1).collect();
    let stdout = io::stdout();
    let stderr = io::stderr();
    let code = ippcode22_cli::run(&argv, &mut stdout.lock(), &mut stderr.lock());
    std::process::exit(code);
}
