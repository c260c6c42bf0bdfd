//! Interactive guided session on the terminal.
//!
//! Reads single-letter commands from stdin and drives a [`GuideSession`].

use std::io::{self, BufRead, Write};
use std::time::Duration;

use color_eyre::eyre::Result;
use indicatif::{ProgressBar, ProgressStyle};
use stepguide_core::{FallbackDecision, GuideSession, StepSnapshot};
use stepguide_shared::{FailureReason, NavigationError, StepGuideError};
use tracing::{debug, warn};

use crate::commands::print_matches;

/// Presentation toggles for the interactive loop.
pub(crate) struct GuideOptions {
    pub typing_indicator: bool,
}

/// What the agent chose at the step prompt.
enum Flow {
    Restart,
    Quit,
}

/// Run the guided loop until the agent quits or stdin closes.
pub(crate) fn run_interactive(
    session: &mut GuideSession,
    article_id: Option<&str>,
    seed: Option<String>,
    options: &GuideOptions,
) -> Result<()> {
    let mut input = io::stdin().lock();
    let mut next_id = article_id.map(str::to_string);
    let mut seed = seed;

    loop {
        let id = match next_id.take() {
            Some(id) => id,
            None => match choose_article(session, &mut input, seed.take())? {
                Some(id) => id,
                None => return Ok(()),
            },
        };

        if let Err(e) = session.start(&id) {
            println!("  {e}");
            continue;
        }
        print_prechecks(session);

        match walk(session, &mut input, options)? {
            Flow::Restart => {
                session.reset();
                println!("\n  Starting over.\n");
            }
            Flow::Quit => return Ok(()),
        }
    }
}

// ---------------------------------------------------------------------------
// Article selection
// ---------------------------------------------------------------------------

fn choose_article(
    session: &GuideSession,
    input: &mut impl BufRead,
    seed: Option<String>,
) -> Result<Option<String>> {
    let mut query = match seed {
        Some(q) => {
            println!("  Searching for: {q}");
            q
        }
        None => match prompt(input, "Describe the problem (blank to quit)")? {
            Some(q) if !q.is_empty() => q,
            _ => return Ok(None),
        },
    };

    loop {
        let outcome = session.search(&query);
        print_matches(&outcome);
        let ids: Vec<String> = outcome
            .matches()
            .iter()
            .map(|m| m.article.id.to_string())
            .collect();

        let label = if ids.is_empty() {
            "Try another description (blank to quit)".to_string()
        } else {
            format!("Pick 1-{} or type a new description (blank to quit)", ids.len())
        };
        let Some(answer) = prompt(input, &label)? else {
            return Ok(None);
        };
        if answer.is_empty() {
            return Ok(None);
        }

        match answer.parse::<usize>() {
            Ok(n) if (1..=ids.len()).contains(&n) => return Ok(Some(ids[n - 1].clone())),
            Ok(_) => println!("  No result with that number."),
            Err(_) => query = answer,
        }
    }
}

fn print_prechecks(session: &GuideSession) {
    let Some(article) = session.active_article() else {
        return;
    };
    println!("\n  {}  ({})", article.title, article.id);
    if !article.prechecks.is_empty() {
        println!("  Before you start:");
        for check in &article.prechecks {
            println!("    - {check}");
        }
    }
}

// ---------------------------------------------------------------------------
// Step loop
// ---------------------------------------------------------------------------

fn walk(session: &mut GuideSession, input: &mut impl BufRead, options: &GuideOptions) -> Result<Flow> {
    loop {
        if let Some(skipped) = session.take_skipped_notice() {
            println!("\n  Skipped {skipped} step(s) already done.");
        }

        let Some(step) = session.current_step() else {
            print_summary(session);
            match finished_prompt(input)? {
                Some(flow) => return Ok(flow),
                None => {
                    report_failure(session, input)?;
                    continue;
                }
            }
        };
        typing(options);
        print_step(&step);

        let Some(key) = prompt(input, "[c]ontinue [b]ack [f]ailed [s]ummary [r]estart [q]uit")?
        else {
            return Ok(Flow::Quit);
        };

        match key.as_str() {
            "c" | "" => {
                let outcome = session.continue_step(Some(&step.step_ref()))?;
                if outcome.stale {
                    debug!(step = %step.step_ref(), "stale continue ignored");
                }
            }
            "b" => match session.back() {
                Ok(_) => {}
                Err(StepGuideError::Navigation(NavigationError::AlreadyAtFirstStep)) => {
                    println!("  Already at the first step.");
                }
                Err(e) => return Err(e.into()),
            },
            "f" => report_failure(session, input)?,
            "s" => print_summary(session),
            "r" => return Ok(Flow::Restart),
            "q" => return Ok(Flow::Quit),
            other => println!("  Unknown command '{other}'."),
        }
    }
}

/// `None` means the agent wants to report a failure on the finished path.
fn finished_prompt(input: &mut impl BufRead) -> Result<Option<Flow>> {
    loop {
        let Some(key) = prompt(input, "[f]ailed anyway [r]estart [q]uit")? else {
            return Ok(Some(Flow::Quit));
        };
        match key.as_str() {
            "r" => return Ok(Some(Flow::Restart)),
            "q" | "" => return Ok(Some(Flow::Quit)),
            "f" => return Ok(None),
            other => println!("  Unknown command '{other}'."),
        }
    }
}

fn print_step(step: &StepSnapshot) {
    let path = if step.path.is_main() {
        String::new()
    } else {
        format!("  [fallback: {}]", step.path)
    };
    println!("\n  Step {} of {}{path}", step.step_number, step.total_steps);
    println!("  {}", step.text);
    if let Some(expected) = &step.expected_result {
        println!("  Expect: {expected}");
    }
    if let Some(say) = &step.say_to_customer {
        println!("  Say: \"{say}\"");
    }
}

fn print_summary(session: &GuideSession) {
    let Some(summary) = session.summary() else {
        println!("  No article in progress.");
        return;
    };
    let status = if summary.is_complete { "complete" } else { "in progress" };
    println!("\n  {} on path '{}': {status}", summary.article_id, summary.active_path);
    println!("  Completed steps: {}", summary.completed_steps.len());
    for step in &summary.completed_steps {
        println!("    done {step}");
    }
    for attempt in &summary.attempted_paths {
        println!(
            "    tried {} / {} at {}",
            attempt.article_id,
            attempt.path,
            attempt.started_at.format("%H:%M:%S")
        );
    }
    for failure in &summary.failure_history {
        let note = failure.note.as_deref().unwrap_or("-");
        println!(
            "    failed {}/{} ({}): {note}",
            failure.article_id,
            failure.step_id,
            failure.reason.label()
        );
    }
}

// ---------------------------------------------------------------------------
// Failure reporting
// ---------------------------------------------------------------------------

fn report_failure(session: &mut GuideSession, input: &mut impl BufRead) -> Result<()> {
    println!("  What happened?");
    for (i, reason) in FailureReason::ALL.iter().enumerate() {
        println!("    {}. {}", i + 1, reason.label());
    }
    let Some(choice) = prompt(input, "Reason")? else {
        return Ok(());
    };
    let reason = match choice.parse::<usize>() {
        Ok(n) if (1..=FailureReason::ALL.len()).contains(&n) => FailureReason::ALL[n - 1],
        _ => match choice.parse::<FailureReason>() {
            Ok(r) => r,
            Err(_) => {
                println!("  Unknown reason.");
                return Ok(());
            }
        },
    };
    let note = prompt(input, "Note (optional)")?.unwrap_or_default();

    let target = {
        let decision = session.report_failure(reason, Some(&note))?;
        match &decision {
            FallbackDecision::SameArticle { fallback, .. } => {
                println!("\n  Fallback available: {}", fallback.condition);
            }
            FallbackDecision::CrossArticle { article, fallback } => {
                println!("\n  Related article '{}' has a fallback: {}", article.title, fallback.condition);
            }
            FallbackDecision::Escalation { escalation: Some(esc) } => {
                println!("\n  Escalate to {} ({})", esc.target, esc.when);
            }
            FallbackDecision::Escalation { escalation: None } => {
                println!("\n  No fallback left. Escalate to support.");
            }
        }
        decision.target()
    };

    let Some(target) = target else {
        return Ok(());
    };
    let confirmed = prompt(input, "Switch to this fallback? [y/n]")?
        .is_some_and(|a| a.eq_ignore_ascii_case("y") || a.eq_ignore_ascii_case("yes"));
    if !confirmed {
        return Ok(());
    }

    let switched = session.switch_to_fallback(&target)?;
    if switched.completed {
        println!("  Every fallback step was already done.");
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Terminal helpers
// ---------------------------------------------------------------------------

/// Print `label`, read one trimmed line. `None` on end of input.
fn prompt(input: &mut impl BufRead, label: &str) -> Result<Option<String>> {
    print!("  {label} > ");
    io::stdout().flush()?;

    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        return Ok(None);
    }
    Ok(Some(line.trim().to_string()))
}

/// Brief spinner before a step appears.
fn typing(options: &GuideOptions) {
    if !options.typing_indicator {
        return;
    }
    let spinner = ProgressBar::new_spinner();
    match ProgressStyle::with_template("  {spinner:.cyan} {msg}") {
        Ok(style) => spinner.set_style(style.tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"])),
        Err(e) => warn!(error = %e, "spinner template rejected"),
    }
    spinner.set_message("typing...");
    spinner.enable_steady_tick(Duration::from_millis(80));
    std::thread::sleep(Duration::from_millis(350));
    spinner.finish_and_clear();
}
