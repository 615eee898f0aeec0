use std::path::Path;
use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, BufReader};

use scheme_assist::backend::{HttpBackend, SchemeFile, UploadRequest};
use scheme_assist::config::ClientConfig;
use scheme_assist::error::StageError;
use scheme_assist::languages;
use scheme_assist::workflow::{Answer, FormView, Stage, Workflow, WorkflowSnapshot};

const HELP: &str = "\
Commands:
  languages                 list supported languages
  lang <code>               pick the language for the next upload
  upload <path>             upload a scheme PDF
  show                      show summary, questions and verdict
  answer <n> <yes|no>       answer question n (1-based)
  check                     check eligibility
  audio                     generate narration of the summary
  save-audio <path>         write the current narration to a file
  cancel <stage>            abandon an upload/eligibility/audio request
  reset                     clear everything
  help                      this text
  quit                      exit";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let config = ClientConfig::from_env()?;
    let backend = Arc::new(HttpBackend::new(&config)?);

    eprintln!("📄 Scheme Assist v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   Backend: {}", config.base_url);
    eprintln!(
        "   Language: {} ({})",
        languages::display_name(&config.default_language),
        config.default_language
    );
    match config.request_timeout {
        Some(t) => eprintln!("   Timeout: {}s", t.as_secs()),
        None => eprintln!("   Timeout: none"),
    }
    eprintln!("   Type 'help' for commands.\n");

    let workflow = Workflow::new(backend, config);

    let stdin = tokio::io::stdin();
    let mut lines = BufReader::new(stdin).lines();
    // The form as last printed; eligibility is checked against it.
    let mut rendered: Option<FormView> = None;

    eprint!("> ");
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            eprint!("> ");
            continue;
        }
        if matches!(line, "quit" | "exit") {
            break;
        }
        run_command(&workflow, line, &mut rendered).await;
        eprint!("> ");
    }

    workflow.reset().await;
    Ok(())
}

async fn run_command(workflow: &Workflow, line: &str, rendered: &mut Option<FormView>) {
    let mut parts = line.split_whitespace();
    let command = parts.next().unwrap_or_default();
    let args: Vec<&str> = parts.collect();

    match (command, args.as_slice()) {
        ("help", _) => println!("{HELP}"),
        ("languages", _) => {
            let snapshot = workflow.snapshot().await;
            for lang in workflow.languages() {
                let marker = if lang.code == snapshot.pending_language {
                    "*"
                } else {
                    " "
                };
                println!("{marker} {:<4} {}", lang.code, lang.name);
            }
        }
        ("lang", [code]) => {
            match workflow.select_language(code).await {
                Ok(()) => println!("Next upload will use {}", languages::display_name(code)),
                Err(e) => report(&e),
            }
        }
        ("upload", [path, ..]) => {
            let file = match SchemeFile::from_path(Path::new(path)).await {
                Ok(file) => file,
                Err(e) => {
                    println!("❌ Could not read {path}: {e}");
                    return;
                }
            };
            let language = workflow.snapshot().await.pending_language;
            eprintln!("⏳ Uploading {} ...", file.file_name);
            match workflow
                .submit_upload(UploadRequest::new(file, language))
                .await
            {
                Ok(_) => *rendered = print_snapshot(&workflow.snapshot().await),
                Err(e) => report(&e),
            }
        }
        ("show", _) => *rendered = print_snapshot(&workflow.snapshot().await),
        ("answer", [index, value]) => {
            let (Ok(index), Some(answer)) = (index.parse::<usize>(), Answer::parse(value)) else {
                println!("Usage: answer <n> <yes|no>");
                return;
            };
            if index == 0 {
                println!("Questions are numbered from 1.");
                return;
            }
            match workflow.set_answer(index - 1, answer).await {
                Ok(()) => {
                    let form = workflow.snapshot().await.form;
                    if let Some(question) = form.questions.get(index - 1) {
                        println!("{index}. {question} [{answer}]");
                    }
                    *rendered = Some(form);
                }
                Err(e) => report(&e),
            }
        }
        ("check", _) => {
            if !workflow.snapshot().await.can_submit_eligibility() {
                println!("No eligibility questions to answer.");
                return;
            }
            let Some(form) = rendered.as_ref() else {
                println!("Run 'show' to see the questions first.");
                return;
            };
            eprintln!("⏳ Checking eligibility ...");
            match workflow.submit_eligibility(form).await {
                Ok(verdict) => {
                    let icon = if verdict.is_eligible { "✅" } else { "❌" };
                    println!("\n{icon} {}\n{}\n", verdict.label(), verdict.result_text);
                }
                Err(e @ StageError::Precondition(_)) => {
                    report(&e);
                    *rendered = print_snapshot(&workflow.snapshot().await);
                }
                Err(e) => report(&e),
            }
        }
        ("audio", _) => {
            if !workflow.snapshot().await.can_request_audio() {
                println!("No summary available to generate audio.");
                return;
            }
            eprintln!("⏳ Generating audio ...");
            match workflow.request_audio().await {
                Ok(resource) => println!("🔊 Audio ready: {}", resource.url()),
                Err(e) => report(&e),
            }
        }
        ("save-audio", [path]) => match workflow.audio_bytes().await {
            Some((bytes, content_type)) => match tokio::fs::write(path, bytes.as_slice()).await {
                Ok(()) => println!("Saved {} bytes ({content_type}) to {path}", bytes.len()),
                Err(e) => println!("❌ Could not write {path}: {e}"),
            },
            None => match workflow.snapshot().await.audio {
                Some(remote) => println!("Narration is hosted at {}", remote.url()),
                None => println!("No audio yet. Run 'audio' first."),
            },
        },
        ("cancel", [stage]) => match stage.parse::<Stage>() {
            Ok(stage) => {
                if workflow.cancel(stage).await {
                    println!("Cancelled {stage} request.");
                } else {
                    println!("No {stage} request in flight.");
                }
            }
            Err(e) => println!("{e}"),
        },
        ("reset", _) => {
            workflow.reset().await;
            *rendered = None;
            println!("Cleared.");
        }
        _ => println!("Unknown command. Type 'help' for commands."),
    }
}

fn report(err: &StageError) {
    if err.is_user_visible() {
        println!("❌ {err}");
    }
}

/// Print the workflow and return the form as shown, if one was.
fn print_snapshot(snapshot: &WorkflowSnapshot) -> Option<FormView> {
    let Some(summary) = &snapshot.summary else {
        println!("No scheme uploaded yet.");
        return None;
    };

    println!();
    if let Some(title) = &summary.title {
        println!("## {title}");
    }
    println!(
        "Language: {} ({})",
        languages::display_name(&snapshot.selected_language),
        snapshot.selected_language
    );
    println!("\n{}\n", summary.summary().unwrap_or("(no summary text)"));

    if snapshot.show_eligibility_form {
        println!("Eligibility questions:");
        for (i, (question, answer)) in snapshot
            .form
            .questions
            .iter()
            .zip(&snapshot.form.answers)
            .enumerate()
        {
            println!("  {}. {question} [{answer}]", i + 1);
        }
        println!();
    } else {
        println!("No eligibility questions for this scheme.\n");
    }

    if let Some(verdict) = &snapshot.verdict {
        println!("Verdict: {}: {}", verdict.label(), verdict.result_text);
    }
    if let Some(audio) = &snapshot.audio {
        println!("Audio: {}", audio.url());
    }
    snapshot
        .show_eligibility_form
        .then(|| snapshot.form.clone())
}
