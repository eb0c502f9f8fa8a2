use std::{env, fs, path::PathBuf};

fn source_args(cmd: clap::Command) -> clap::Command {
    cmd.arg(clap::arg!(<INPUT> "URL to fetch, local HTML file, or '-' for stdin"))
        .arg(clap::arg!(--timeout <SECS> "HTTP timeout in seconds").default_value("30"))
        .arg(clap::arg!(--user_agent <UA> "Custom User-Agent for HTTP requests").long("user-agent"))
        .arg(clap::arg!(--raw "Use the markup as loaded, without cleaning"))
}

fn main() {
    println!("cargo:rerun-if-changed=build.rs");
    println!("cargo:rerun-if-env-changed=OUT_DIR");

    let out_dir = PathBuf::from(env::var("OUT_DIR").unwrap());
    let completions_dir = out_dir.join("completions");

    fs::create_dir_all(&completions_dir).unwrap();

    let fetch = source_args(clap::Command::new("fetch").about("Fetch a page and print its cleaned markup or text"))
        .arg(clap::arg!(--text "Print visible text instead of cleaned HTML"))
        .arg(
            clap::arg!(-o --output <FILE> "Output file (default: stdout)")
                .value_parser(clap::value_parser!(std::path::PathBuf)),
        );

    let stats = source_args(clap::Command::new("stats").about("Print structural statistics of a page"))
        .arg(clap::arg!(--json "Print statistics as JSON"));

    let extract = source_args(clap::Command::new("extract").about("Extract a table from a page"))
        .arg(clap::arg!(-q --query <QUERY> "What to extract").required(true))
        .arg(clap::arg!(-m --model <MODEL> "Model identifier").default_value("llama-3.1-8b-instant"))
        .arg(
            clap::arg!(-f --format <FORMAT> "Output format (csv, json, text)")
                .default_value("text")
                .value_parser(["csv", "json", "text"]),
        )
        .arg(
            clap::arg!(-o --output <FILE> "Output file (default: stdout)")
                .value_parser(clap::value_parser!(std::path::PathBuf)),
        )
        .arg(clap::arg!(--api_key <KEY> "Provider API key").long("api-key"))
        .arg(clap::arg!(--base_url <URL> "OpenAI-compatible endpoint").long("base-url"))
        .arg(clap::arg!(--temperature <TEMP> "Sampling temperature").default_value("0.1"))
        .arg(
            clap::arg!(--dry_run "Print the reduced content that would be sent, without calling the model")
                .long("dry-run"),
        );

    let models = clap::Command::new("models")
        .about("List the registered models and their token limits")
        .arg(clap::arg!(--json "Print the registry as JSON"));

    let mut cmd = clap::Command::new("tabex")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Extract tables from web pages with a language model")
        .arg(clap::arg!(-v --verbose "Enable debug logging").global(true))
        .subcommand(fetch)
        .subcommand(stats)
        .subcommand(extract)
        .subcommand(models);

    clap_complete::generate_to(clap_complete::shells::Bash, &mut cmd, "tabex", &completions_dir).unwrap();
    clap_complete::generate_to(clap_complete::shells::Zsh, &mut cmd, "tabex", &completions_dir).unwrap();
    clap_complete::generate_to(clap_complete::shells::Fish, &mut cmd, "tabex", &completions_dir).unwrap();
    clap_complete::generate_to(clap_complete::shells::PowerShell, &mut cmd, "tabex", &completions_dir).unwrap();

    println!(
        "cargo:warning=Shell completions generated in: {}",
        completions_dir.display()
    );
}
