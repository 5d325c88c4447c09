use std::process::ExitCode;

fn main() -> ExitCode {
    macs2hf::app::main()
}
