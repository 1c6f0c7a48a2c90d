use std::{
    io::{
        self,
        BufRead,
        Write,
    },
    path::PathBuf,
    process::ExitCode,
};

use clap::{
    Parser,
    Subcommand,
};
use suggestr::{
    config::GlobalConfig,
    dispatch::{
        Dispatcher,
        Outcome,
        QueryEditor,
        Trigger,
    },
    host::JsonNoteHost,
    persistence::ConfigStore,
    providers::HttpProviders,
    session::ProfileSelection,
    SuggestError,
};

#[derive(Parser, Debug)]
#[command(name = "suggestr")]
#[command(about = "Fill note fields with image, pronunciation and text suggestions")]
struct Cli {
    /// Config file (defaults to the app data directory)
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Profile to use instead of the active one
    #[arg(long, value_name = "NAME")]
    profile: Option<String>,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run one action against one field of a note
    Suggest {
        #[arg(long, value_name = "FILE")]
        note: PathBuf,
        /// Button name or command id
        #[arg(long)]
        action: String,
        /// Field to write into; "Tags" appends to the tag list
        #[arg(long)]
        field: String,
        /// Review the query before sending it
        #[arg(long)]
        confirm: bool,
    },
    /// Fill every enabled field of the note's template
    Fill {
        #[arg(long, value_name = "FILE")]
        note: PathBuf,
    },
    /// List profiles
    Profiles,
    /// Make a profile the active one
    UseProfile { name: String },
    /// Report configuration problems
    Check,
}

/// Reads an edited query from stdin. Empty keeps the query, `q` cancels.
struct StdinEditor;

impl QueryEditor for StdinEditor {
    fn edit(&mut self, query: &str) -> Option<String> {
        eprint!("Query: {query}\nEdit (enter keeps, q cancels): ");
        let _ = io::stderr().flush();

        let mut line = String::new();
        if io::stdin().lock().read_line(&mut line).is_err() {
            return None;
        }
        match line.trim() {
            "" => Some(query.to_string()),
            "q" => None,
            edited => Some(edited.to_string()),
        }
    }
}

fn setup_tracing(verbose: bool) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if verbose {
            EnvFilter::new("suggestr=debug,info")
        } else {
            EnvFilter::new("info")
        }
    });
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(io::stderr).init();
}

fn report(field: Option<&str>, outcome: &Outcome) -> bool {
    let prefix = field.map(|f| format!("{f}: ")).unwrap_or_default();
    match outcome {
        Outcome::Done(target) => println!("{prefix}wrote {target}"),
        Outcome::Skipped(notice) => println!("{prefix}skipped ({notice})"),
        Outcome::Failed(e) => println!("{prefix}failed ({e})"),
    }
    !outcome.is_failed()
}

fn selection(config: &GlobalConfig, profile: Option<&str>) -> Result<ProfileSelection, SuggestError> {
    let mut selection = ProfileSelection::from_config(config);
    if let Some(name) = profile {
        selection.select(config, name)?;
    }
    Ok(selection)
}

fn run(cli: Cli) -> Result<bool, SuggestError> {
    let store = cli.config.map(ConfigStore::at).unwrap_or_default();
    let mut config = store.load()?;

    match cli.command {
        Command::Suggest { note, action, field, confirm } => {
            let button = config
                .button(&action)
                .ok_or_else(|| SuggestError::validation(format!("No action named \"{action}\"")))?;
            let selection = selection(&config, cli.profile.as_deref())?;
            let profile = selection.profile(&config)?;
            let providers = HttpProviders::new()?;

            let mut host = JsonNoteHost::load(&note)?;
            host.focus(&field)?;

            let mut editor = StdinEditor;
            let trigger = if confirm { Trigger::Confirm(&mut editor) } else { Trigger::Fast };
            let outcome = Dispatcher::new(&config, profile, &providers).run_action(&mut host, button, trigger);
            Ok(report(None, &outcome))
        }
        Command::Fill { note } => {
            let selection = selection(&config, cli.profile.as_deref())?;
            let profile = selection.profile(&config)?;
            let providers = HttpProviders::new()?;

            let mut host = JsonNoteHost::load(&note)?;
            let bulk = Dispatcher::new(&config, profile, &providers).fill_note(&mut host);
            if let Some(notice) = &bulk.skipped {
                println!("skipped ({notice})");
                return Ok(true);
            }
            let mut ok = true;
            for (field, outcome) in &bulk.fields {
                ok &= report(Some(field), outcome);
            }
            println!("{}/{} fields filled", bulk.done_count(), bulk.fields.len());
            if let Some(e) = &bulk.refresh_error {
                println!("note not saved ({e})");
                ok = false;
            }
            Ok(ok)
        }
        Command::Profiles => {
            let active = selection(&config, cli.profile.as_deref())?.profile(&config)?.name.clone();
            for profile in &config.profiles {
                let marker = if profile.name == active { "*" } else { " " };
                println!(
                    "{} {} (language {}, model {}, {} images, {} tokens, temperature {})",
                    marker,
                    profile.name,
                    profile.language,
                    profile.model,
                    profile.num_images(),
                    profile.max_tokens(),
                    profile.temperature()
                );
            }
            Ok(true)
        }
        Command::UseProfile { name } => {
            let mut selection = ProfileSelection::from_config(&config);
            selection.select(&config, &name)?;
            selection.store(&mut config)?;
            store.save(&config)?;
            println!("Active profile: {name}");
            Ok(true)
        }
        Command::Check => {
            let problems = config.validate();
            for problem in &problems {
                println!("{problem}");
            }
            if problems.is_empty() {
                println!("Config at {} is valid", store.path().display());
            }
            Ok(problems.is_empty())
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    setup_tracing(cli.verbose);

    match run(cli) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}
