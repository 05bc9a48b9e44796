//! CLI entry point for the YaRISC emulator.

mod app;

use std::env;
use std::ffi::OsString;
use std::io::IsTerminal as _;
use std::path::PathBuf;
use std::process::ExitCode;

use yarisc_core::{ExecutionMode, FeatureLevel, Machine, OutputFormat, FEATURE_LEVEL_LATEST};

use app::Session;

const HELP_TEXT: &str = "Usage: yarisc-emu [<image>] [--level <n>] [--normal] [--batch] [--help]";

#[derive(Debug, PartialEq, Eq)]
struct CliArgs {
    image: Option<PathBuf>,
    level: FeatureLevel,
    mode: ExecutionMode,
    batch: bool,
}

#[derive(Debug)]
enum ParseResult {
    Args(CliArgs),
    Help,
}

fn parse_args(mut args: impl Iterator<Item = OsString>) -> Result<ParseResult, String> {
    let mut image: Option<PathBuf> = None;
    let mut level = FEATURE_LEVEL_LATEST;
    let mut mode = ExecutionMode::Strict;
    let mut batch = false;

    while let Some(arg) = args.next() {
        if arg == "--help" {
            return Ok(ParseResult::Help);
        }

        if arg == "--normal" {
            mode = ExecutionMode::Normal;
            continue;
        }

        if arg == "--batch" {
            batch = true;
            continue;
        }

        if arg == "--level" {
            let value = args
                .next()
                .ok_or_else(|| String::from("missing value for --level"))?;
            let value: u16 = value
                .to_string_lossy()
                .parse()
                .map_err(|_| format!("invalid level value: {}", value.to_string_lossy()))?;

            level = FeatureLevel::from_u16(value).map_err(|error| error.to_string())?;
            continue;
        }

        if arg.to_string_lossy().starts_with('-') {
            return Err(format!("unknown option: {}", arg.to_string_lossy()));
        }

        if image.is_some() {
            return Err(String::from("multiple image paths provided"));
        }
        image = Some(PathBuf::from(arg));
    }

    if batch && image.is_none() {
        return Err(String::from("batch mode requires an image"));
    }

    Ok(ParseResult::Args(CliArgs {
        image,
        level,
        mode,
        batch,
    }))
}

fn run_batch(args: &CliArgs) -> ExitCode {
    let mut machine = Machine::with_level(args.level);

    let image = args.image.as_deref().expect("batch mode has an image");
    if let Err(error) = machine.load(image) {
        eprintln!("Error: {error}");
        return ExitCode::FAILURE;
    }

    match machine.execute(args.mode) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => {
            eprintln!("A breakpoint was hit");
            ExitCode::FAILURE
        }
        Err(error) => {
            eprintln!("Error: {error}");
            ExitCode::FAILURE
        }
    }
}

fn run_interactive(args: &CliArgs) -> ExitCode {
    let mut machine = Machine::with_debugger(args.level);

    if let Some(image) = args.image.as_deref() {
        if let Err(error) = machine.load(image) {
            eprintln!("Error: {error}");
            return ExitCode::FAILURE;
        }
    }

    let format = if std::io::stdout().is_terminal() {
        OutputFormat::Colored
    } else {
        OutputFormat::Plain
    };

    let mut session = Session::new(machine, args.mode, format);

    match session.run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            eprintln!("Error: {error}");
            ExitCode::FAILURE
        }
    }
}

fn main() -> ExitCode {
    match parse_args(env::args_os().skip(1)) {
        Ok(ParseResult::Help) => {
            println!("{HELP_TEXT}");
            ExitCode::SUCCESS
        }
        Ok(ParseResult::Args(args)) => {
            if args.batch {
                run_batch(&args)
            } else {
                run_interactive(&args)
            }
        }
        Err(error) => {
            eprintln!("error: {error}");
            eprintln!("{HELP_TEXT}");
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{parse_args, CliArgs, ParseResult};
    use std::ffi::OsString;
    use std::path::PathBuf;
    use yarisc_core::{ExecutionMode, FeatureLevel};

    fn parse(args: &[&str]) -> Result<ParseResult, String> {
        parse_args(args.iter().map(OsString::from))
    }

    fn parsed(args: &[&str]) -> CliArgs {
        match parse(args).expect("arguments should parse") {
            ParseResult::Args(args) => args,
            ParseResult::Help => panic!("expected parsed args"),
        }
    }

    #[test]
    fn defaults_are_interactive_strict_latest() {
        let args = parsed(&[]);

        assert_eq!(args.image, None);
        assert_eq!(args.level, FeatureLevel::V1);
        assert_eq!(args.mode, ExecutionMode::Strict);
        assert!(!args.batch);
    }

    #[test]
    fn parses_image_level_and_mode() {
        let args = parsed(&["program.img", "--level", "10", "--normal"]);

        assert_eq!(args.image, Some(PathBuf::from("program.img")));
        assert_eq!(args.level, FeatureLevel::Min);
        assert_eq!(args.mode, ExecutionMode::Normal);
    }

    #[test]
    fn help_flag_wins() {
        assert!(matches!(
            parse(&["program.img", "--help"]),
            Ok(ParseResult::Help)
        ));
    }

    #[test]
    fn unknown_levels_are_rejected_with_the_core_message() {
        let error = parse(&["--level", "42"]).expect_err("unknown level");
        assert_eq!(error, "Invalid feature level 42");

        let error = parse(&["--level", "abc"]).expect_err("non-numeric level");
        assert_eq!(error, "invalid level value: abc");
    }

    #[test]
    fn batch_mode_requires_an_image() {
        let error = parse(&["--batch"]).expect_err("missing image");
        assert_eq!(error, "batch mode requires an image");

        let args = parsed(&["--batch", "program.img"]);
        assert!(args.batch);
    }

    #[test]
    fn unknown_options_and_extra_images_are_rejected() {
        assert!(parse(&["--frob"]).is_err());
        assert!(parse(&["a.img", "b.img"]).is_err());
    }
}
