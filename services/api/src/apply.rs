use clap::Args;
use credit_approval::config::{AppConfig, CollaboratorConfig};
use credit_approval::error::AppError;
use credit_approval::workflows::credit::{
    DecisionServices, FinancialDraft, HttpDecisionServices, NoticeTone, RiskAnswers,
    WorkflowController, WorkflowSnapshot, WorkflowStep,
};

#[derive(Args, Debug, Default)]
pub(crate) struct ApplyArgs {
    /// The applicant has a paying job
    #[arg(long)]
    pub(crate) has_job: bool,
    /// The applicant held a paying job for the past 12 months
    #[arg(long)]
    pub(crate) consistent_job: bool,
    /// The applicant owns a home
    #[arg(long)]
    pub(crate) owns_home: bool,
    /// The applicant owns a car
    #[arg(long)]
    pub(crate) owns_car: bool,
    /// The applicant has an additional source of income
    #[arg(long)]
    pub(crate) additional_income: bool,
    /// Monthly income in whole dollars
    #[arg(long)]
    pub(crate) income: String,
    /// Monthly expenses in whole dollars
    #[arg(long)]
    pub(crate) expenses: String,
    /// Address for the approval PDF. Without it the run stops after the credit offer.
    #[arg(long)]
    pub(crate) email: Option<String>,
    /// Base URL of the decision services, overriding APP_COLLABORATOR_BASE_URL
    #[arg(long)]
    pub(crate) collaborator_url: Option<String>,
}

impl ApplyArgs {
    fn answers(&self) -> RiskAnswers {
        RiskAnswers {
            has_job: self.has_job,
            consistent_job: self.consistent_job,
            owns_home: self.owns_home,
            owns_car: self.owns_car,
            additional_income: self.additional_income,
        }
    }
}

pub(crate) async fn run_application(args: ApplyArgs) -> Result<(), AppError> {
    let endpoints = match args.collaborator_url.as_deref() {
        Some(base_url) => CollaboratorConfig::from_base_url(base_url),
        None => AppConfig::load()?.collaborators,
    };
    let services = HttpDecisionServices::new(endpoints)?;

    let mut controller = WorkflowController::new();
    drive(&mut controller, &services, &args).await?;
    Ok(())
}

/// Walk the workflow as far as the arguments allow, printing every step reached.
pub(crate) async fn drive<S>(
    controller: &mut WorkflowController,
    services: &S,
    args: &ApplyArgs,
) -> Result<WorkflowStep, AppError>
where
    S: DecisionServices + ?Sized,
{
    controller.set_risk_answers(args.answers())?;
    submit_and_print(controller, services).await?;
    if controller.step() == WorkflowStep::Rejected {
        return Ok(controller.step());
    }

    controller.set_financial_draft(FinancialDraft::new(&args.income, &args.expenses))?;
    submit_and_print(controller, services).await?;

    if let Some(email) = &args.email {
        controller.set_email(email.clone())?;
        submit_and_print(controller, services).await?;
    }

    Ok(controller.step())
}

async fn submit_and_print<S>(
    controller: &mut WorkflowController,
    services: &S,
) -> Result<(), AppError>
where
    S: DecisionServices + ?Sized,
{
    let result = controller.submit(services).await;
    for line in render_snapshot(&controller.snapshot()) {
        println!("{line}");
    }
    result.map(|_| ()).map_err(AppError::from)
}

pub(crate) fn render_snapshot(snapshot: &WorkflowSnapshot) -> Vec<String> {
    let mut lines = vec![format!("== {} ==", snapshot.title)];
    for notice in &snapshot.notices {
        let marker = match notice.tone {
            NoticeTone::Success => "+",
            NoticeTone::Failure => "!",
            NoticeTone::Info => "-",
        };
        lines.push(format!("{marker} {}", notice.text));
    }
    lines
}
