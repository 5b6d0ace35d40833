use simple_shell::Interpreter;
use std::io::{IsTerminal, Write};
use std::process::exit;

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"))
        .format_timestamp(None)
        .init();

    let mut stdout = std::io::stdout();
    if stdout.is_terminal() {
        // Clear the screen and move the cursor home.
        print!("\x1b[H\x1b[J");
        let _ = stdout.flush();
    }

    if let Err(e) = Interpreter::default().repl() {
        log::error!("{}", e);
        exit(1);
    }
}
