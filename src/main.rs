fn main() {
    let args: Vec<String> = std::env::args().skip(1).collect();
    if handle_cli_flags(&args) {
        return;
    }

    // A bare argument is a start location, e.g. `dark-kokan '#about'`.
    let start_location = args.iter().find(|arg| !arg.starts_with('-')).cloned();

    if let Err(err) = dark_kokan::run(start_location) {
        eprintln!("error: {err:?}");
        std::process::exit(1);
    }
}

fn handle_cli_flags(args: &[String]) -> bool {
    let mut saw_flag = false;
    for arg in args {
        match arg.as_str() {
            "--version" | "-V" => {
                println!("Dark Kokan {}", dark_kokan::VERSION);
                saw_flag = true;
            }
            "--help" | "-h" => {
                println!(
                    "Dark Kokan — browse the channel from the terminal.\n\nUsage: dark-kokan [#tab]\n\n  #tab                 Start location (#videos or #about)\n  --version, -V        Show version and exit\n  --help,    -h        Show this help message"
                );
                saw_flag = true;
            }
            _ => {}
        }
    }
    saw_flag
}
