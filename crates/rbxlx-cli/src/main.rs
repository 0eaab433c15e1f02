use std::process;

use rbxlx_ops::ExitCode;

fn main() {
    match rbxlx_cli::run() {
        Ok(code) => process::exit(code),
        Err(err) => {
            eprintln!("rbxlx-build error: {err:#}");
            process::exit(ExitCode::Io.code());
        }
    }
}
