//! Standalone validator for form definition files.
//!
//! This tool validates the JSON form definition used by the form bot,
//! checking for proper structure, usable entry keys, and other
//! requirements. It can also check a saved-answers file against the
//! definition to report which users would fail to submit.

use std::process::ExitCode;

use clap::Parser;

// Import from the main crate
use gform_bot::answers::AnswerStore;
use gform_bot::config::{FormConfig, ValidationError};
use gform_bot::submitter::build_payload;

/// Form definition validator.
#[derive(Parser, Debug)]
#[command(name = "validate_form")]
#[command(about = "Validates form definition files for the form bot")]
#[command(version)]
struct Args {
    /// Path to the JSON form definition file to validate.
    #[arg(short, long, default_value = "form.json")]
    file: String,

    /// Also check this saved-answers file against the definition.
    #[arg(short, long)]
    answers: Option<String>,

    /// Generate an example form definition file at the specified path.
    #[arg(long)]
    generate_example: Option<String>,

    /// Show detailed information for each field.
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> ExitCode {
    let args = Args::parse();

    // Handle example generation
    if let Some(output_path) = args.generate_example {
        return generate_example(&output_path);
    }

    // Validate the form definition file
    if !validate_form(&args.file, args.verbose) {
        return ExitCode::FAILURE;
    }

    // Optionally check saved answers against it
    let answers_ok = match args.answers {
        Some(answers_path) => check_answers(&args.file, &answers_path),
        None => true,
    };

    if answers_ok {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

fn generate_example(output_path: &str) -> ExitCode {
    let example = FormConfig::example();

    match example.save_to_file(output_path) {
        Ok(()) => {
            println!("✓ Example form definition written to: {output_path}");
            println!("\nThe file contains {} example fields.", example.len());
            println!("Replace the URL and entry keys with your form's values.");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("✗ Failed to write example file: {e}");
            ExitCode::FAILURE
        }
    }
}

fn validate_form(path: &str, verbose: bool) -> bool {
    println!("Validating: {path}\n");

    // Load the form definition
    let form = match FormConfig::load_from_file(path) {
        Ok(f) => f,
        Err(e) => {
            eprintln!("✗ Failed to load form definition: {e}");
            return false;
        }
    };

    // Structural errors are not per-field; report them and stop early
    if let Err(
        e @ (ValidationError::EmptyUrl
        | ValidationError::InvalidUrl { .. }
        | ValidationError::NoFields),
    ) = form.validate()
    {
        eprintln!("✗ {e}");
        return false;
    }

    // Validate all fields
    let results = form.validate_all();

    let mut errors = 0;

    for (i, result) in results.iter().enumerate() {
        let field = &form.fields[i];

        if verbose {
            println!(
                "[{}] \"{}\"{}",
                field.key,
                field.label,
                if field.required { " (required)" } else { "" }
            );
        }

        match result {
            Ok(()) => {
                if verbose {
                    println!("  ✓ OK");
                }
            }
            Err(e) => {
                errors += 1;
                println!("  ✗ Error: {e}");
            }
        }
    }

    println!();

    // Summary
    let total = form.len();
    let valid = total - errors;

    if errors == 0 {
        println!("✓ All {total} fields are valid!");
        println!("\nSubmission endpoint: {}", form.response_url());
        true
    } else {
        println!("✗ Validation failed: {errors} error(s) in {total} fields");
        println!("  Valid: {valid}/{total}");
        false
    }
}

fn check_answers(form_path: &str, answers_path: &str) -> bool {
    println!("\nChecking answers: {answers_path}");

    let form = match FormConfig::load_from_file(form_path) {
        Ok(f) => f,
        Err(e) => {
            eprintln!("✗ Failed to load form definition: {e}");
            return false;
        }
    };

    let store = match AnswerStore::load(answers_path) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("✗ Failed to load answers: {e}");
            return false;
        }
    };

    if store.is_empty() {
        println!("No saved answers to check.");
        return true;
    }

    let mut incomplete = 0;

    for (user, record) in store.iter() {
        match build_payload(&form, record) {
            Ok(payload) => {
                println!("  ✓ User {user}: {} answer(s), submittable", payload.len());
            }
            Err(e) => {
                incomplete += 1;
                println!("  ✗ User {user}: {e}");
            }
        }
    }

    if incomplete == 0 {
        println!("\n✓ All {} record(s) are submittable.", store.len());
        true
    } else {
        println!(
            "\n✗ {incomplete} of {} record(s) would fail to submit.",
            store.len()
        );
        false
    }
}
