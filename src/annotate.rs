//! Annotate stage: collects the four board corners for a capture.
//! Interactive mode prompts for each tap in order (TL → TR → BR → BL) and
//! accepts `reset` / `back` at any point; list mode takes all four at once.

use anyhow::{Context, Result};
use dialoguer::{Confirm, Input};

use crate::capture::CapturedImage;
use crate::corners::{ChessboardCorners, CornerError, CornerSelection, Point, Size, parse_point};

#[derive(Debug)]
pub enum AnnotateOutcome {
    Confirmed(ChessboardCorners),
    Back,
}

/// One line of user input at the corner prompt.
#[derive(Debug, PartialEq)]
enum Command {
    Tap(Point),
    Reset,
    Back,
}

fn parse_command(input: &str) -> Result<Command> {
    match input.trim().to_ascii_lowercase().as_str() {
        "r" | "reset" => Ok(Command::Reset),
        "b" | "back" => Ok(Command::Back),
        other => Ok(Command::Tap(parse_point(other)?)),
    }
}

fn selection_for(image: &CapturedImage, display: Option<Size>) -> CornerSelection {
    CornerSelection::new(display.unwrap_or(image.size)).with_image(&image.path, image.size)
}

/// Prompts for corners until confirmed or the user goes back.
/// `display` is the size of the view the coordinates are read from; defaults to the image size.
pub fn annotate_interactive(image: &CapturedImage, display: Option<Size>) -> Result<AnnotateOutcome> {
    let mut selection = selection_for(image, display);
    println!(
        "Tag the board corners in {} display coordinates.",
        selection.display()
    );
    println!("Order: Top-Left → Top-Right → Bottom-Right → Bottom-Left. Enter `x,y`, `reset` or `back`.");

    loop {
        let Some(label) = selection.next_label() else {
            let confirmed = Confirm::new()
                .with_prompt("Confirm these corners?")
                .default(true)
                .interact()
                .context("Failed to read confirmation")?;
            match apply_confirmation(&mut selection, confirmed)? {
                Some(corners) => return Ok(AnnotateOutcome::Confirmed(corners)),
                None => continue,
            }
        };

        let line: String = Input::new()
            .with_prompt(format!("{} ({}/4)", label, selection.count()))
            .interact_text()
            .context("Failed to read corner")?;

        let step = parse_command(&line).and_then(|cmd| Ok(apply_command(&mut selection, cmd)?));
        match step {
            Ok(Step::Back) => return Ok(AnnotateOutcome::Back),
            Ok(Step::Cleared) => println!("Corners cleared."),
            Ok(Step::Continue) => {}
            Err(e) => println!("{}", e),
        }
    }
}

/// What the prompt loop does after one command.
#[derive(Debug, PartialEq)]
enum Step {
    Continue,
    Cleared,
    Back,
}

fn apply_command(selection: &mut CornerSelection, command: Command) -> Result<Step, CornerError> {
    match command {
        Command::Back => Ok(Step::Back),
        Command::Reset => {
            selection.reset();
            Ok(Step::Cleared)
        }
        Command::Tap(p) => {
            selection.tap(p)?;
            Ok(Step::Continue)
        }
    }
}

/// Accepting yields the corner set; declining starts the selection over.
fn apply_confirmation(
    selection: &mut CornerSelection,
    confirmed: bool,
) -> Result<Option<ChessboardCorners>, CornerError> {
    if confirmed {
        return selection.confirm().map(Some);
    }
    selection.reset();
    Ok(None)
}

/// Non-interactive annotation from four already-parsed points.
pub fn annotate_from_list(
    image: &CapturedImage,
    points: &[Point],
    display: Option<Size>,
) -> Result<ChessboardCorners> {
    let mut selection = selection_for(image, display);
    for p in points {
        selection.tap(*p)?;
    }
    Ok(selection.confirm()?)
}
