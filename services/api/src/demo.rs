use crate::infra::{ConsoleNotifier, ConsoleSync, InMemoryApplicationStore};
use clap::Args;
use member_intake::error::AppError;
use member_intake::workflows::membership::export::write_csv;
use member_intake::workflows::membership::{
    AdminRoster, AnswerOutcome, ApplicantIdentity, ApplicationId, ApplicationStore, BeginOutcome,
    ContactChannelId, DecisionAction, IntakeCoordinator, LifecycleController, SurveyDefinition,
    UserId,
};
use std::sync::Arc;

const DEMO_ADMIN: UserId = UserId(1);
const DEMO_INVITE: &str = "https://community.example.com/join";

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Print a CSV export of the demo records at the end
    #[arg(long)]
    pub(crate) export: bool,
}

type DemoCoordinator = IntakeCoordinator<InMemoryApplicationStore, ConsoleSync, ConsoleNotifier>;

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    println!("Membership intake demo (in-memory infrastructure)");

    let store = Arc::new(InMemoryApplicationStore::default());
    let controller = Arc::new(LifecycleController::new(
        store.clone(),
        Arc::new(ConsoleSync),
        Arc::new(ConsoleNotifier),
        AdminRoster::new([DEMO_ADMIN]),
        SurveyDefinition::standard(),
        Some(DEMO_INVITE.to_string()),
    ));
    let coordinator = IntakeCoordinator::new(controller.clone());

    println!("\nApplicant 1001 runs the survey");
    let approved = walk_survey(
        &coordinator,
        demo_identity(1001, "ada", "Ada L."),
        &[
            "Ada Lovelace",
            "36",
            "10 hours a week",
            "https://example.com/work",
            "Build useful things with the community",
        ],
    )?;

    println!("\nApplicant 1002 runs the survey");
    let declined = walk_survey(
        &coordinator,
        demo_identity(1002, "boris", "Boris"),
        &[
            "Boris Example",
            "29",
            "2 hours a month",
            "none yet",
            "Just curious",
        ],
    )?;

    println!("\nAdmin review queue");
    for entry in controller.pending_queue(DEMO_ADMIN, 10)? {
        println!(
            "  #{} {} ({} earlier submissions)",
            entry.application.id,
            entry.application.display_name.as_deref().unwrap_or("-"),
            entry.history.len().saturating_sub(1)
        );
    }

    if let Some(id) = approved {
        println!("\nAdmin approves application #{id}");
        let outcome = controller.decide(DEMO_ADMIN, id, DecisionAction::Approve, None)?;
        println!("  {}", outcome.summary());

        println!("\nAdmin repeats the approval (idempotent)");
        let repeat = controller.decide(DEMO_ADMIN, id, DecisionAction::Approve, None)?;
        println!("  {}", repeat.summary());

        println!("\nApplicant 1001 tries the survey again");
        match coordinator.begin(demo_identity(1001, "ada", "Ada L."))? {
            BeginOutcome::Blocked(reason) => println!("  blocked: {}", reason.message()),
            BeginOutcome::Question(_) => println!("  unexpected: survey restarted"),
        }
    }

    if let Some(id) = declined {
        println!("\nAdmin declines application #{id}");
        let outcome = controller.decide(
            DEMO_ADMIN,
            id,
            DecisionAction::Decline,
            Some("not enough availability".to_string()),
        )?;
        println!("  {}", outcome.summary());
    }

    if args.export {
        println!("\nCSV export of all demo records");
        let applications = store.list_all()?;
        let stdout = std::io::stdout();
        write_csv(stdout.lock(), &SurveyDefinition::standard(), &applications)?;
    }

    Ok(())
}

fn demo_identity(applicant: i64, username: &str, display_name: &str) -> ApplicantIdentity {
    ApplicantIdentity {
        applicant_id: UserId(applicant),
        contact_channel_id: ContactChannelId(applicant),
        username: Some(username.to_string()),
        display_name: Some(display_name.to_string()),
    }
}

fn walk_survey(
    coordinator: &DemoCoordinator,
    identity: ApplicantIdentity,
    answers: &[&str],
) -> Result<Option<ApplicationId>, AppError> {
    let applicant = identity.applicant_id;
    match coordinator.begin(identity)? {
        BeginOutcome::Question(prompt) => println!("  Q{}: {}", prompt.index + 1, prompt.prompt),
        BeginOutcome::Blocked(reason) => {
            println!("  blocked: {}", reason.message());
            return Ok(None);
        }
    }

    for (index, text) in answers.iter().enumerate() {
        println!("  A{}: {}", index + 1, text);
        match coordinator.answer(applicant, index, text)? {
            AnswerOutcome::Question(prompt) => {
                println!("  Q{}: {}", prompt.index + 1, prompt.prompt)
            }
            AnswerOutcome::Completed { application_id } => {
                println!("  application #{application_id} recorded, pending review");
                return Ok(Some(application_id));
            }
            other => {
                println!("  survey interrupted: {other:?}");
                return Ok(None);
            }
        }
    }
    Ok(None)
}
