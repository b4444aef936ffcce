use std::process::ExitCode;

fn main() -> ExitCode {
    match medclinic_lib::run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(_) => ExitCode::FAILURE,
    }
}
