//! Subcommands and their execution against a [`WorkflowSession`].

use anyhow::{Context, bail};
use clap::{Args, Subcommand};
use flowdeck_core::{
    DagResultId, NodeId, PeriodicSchedule, RetentionPolicy, RunParameters, Schedule, TriggerType,
    WorkflowId, WorkflowUpdate,
};
use flowdeck_state::{Canvas, ResultOption, WorkflowSession};
use serde::Serialize;
use serde_json::{Value, json};

use crate::TRACING_TARGET_COMMAND;

/// Available subcommands.
#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Print a workflow's runs and the collapsed DAG of the selected run.
    Show(ShowArgs),
    /// Print the detail panel of one node.
    Node(NodeArgs),
    /// Trigger a new run.
    Run(RunArgs),
    /// Change workflow settings.
    Edit(EditArgs),
    /// Delete a workflow and all its runs.
    Delete(DeleteArgs),
}

#[derive(Debug, Clone, Args)]
pub struct ShowArgs {
    /// Workflow to open.
    pub workflow: WorkflowId,
    /// Run to select by id.
    #[arg(long, conflicts_with = "index")]
    pub result: Option<DagResultId>,
    /// Run to select by position, newest first.
    #[arg(long)]
    pub index: Option<usize>,
}

#[derive(Debug, Clone, Args)]
pub struct NodeArgs {
    /// Workflow to open.
    pub workflow: WorkflowId,
    /// Operator or artifact to inspect.
    pub node: NodeId,
    /// Run to inspect; defaults to the newest.
    #[arg(long)]
    pub result: Option<DagResultId>,
}

#[derive(Debug, Clone, Args)]
pub struct RunArgs {
    /// Workflow to run.
    pub workflow: WorkflowId,
    /// Parameter override as `name=value`; the value is read as JSON when it parses.
    #[arg(long = "param", value_parser = parse_param)]
    pub params: Vec<(String, Value)>,
}

#[derive(Debug, Clone, Args)]
pub struct EditArgs {
    /// Workflow to edit.
    pub workflow: WorkflowId,
    /// New name.
    #[arg(long)]
    pub name: Option<String>,
    /// New description.
    #[arg(long)]
    pub description: Option<String>,
    /// Run on this cron schedule.
    #[arg(long, conflicts_with = "manual")]
    pub cron: Option<String>,
    /// Only run when triggered.
    #[arg(long)]
    pub manual: bool,
    /// Pause or resume scheduled runs.
    #[arg(long)]
    pub paused: Option<bool>,
    /// Keep only this many recent runs; `-1` keeps everything.
    #[arg(long, allow_negative_numbers = true)]
    pub keep_runs: Option<i64>,
}

#[derive(Debug, Clone, Args)]
pub struct DeleteArgs {
    /// Workflow to delete.
    pub workflow: WorkflowId,
    /// Confirm the deletion.
    #[arg(long)]
    pub yes: bool,
}

#[derive(Debug, Serialize)]
struct ShowOutput {
    workflow_id: WorkflowId,
    results: Vec<ResultOption>,
    canvas: Canvas,
}

impl Command {
    /// Subcommand name, for logging.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Show(_) => "show",
            Self::Node(_) => "node",
            Self::Run(_) => "run",
            Self::Edit(_) => "edit",
            Self::Delete(_) => "delete",
        }
    }

    /// Runs the subcommand and returns what to print.
    pub async fn execute(&self, session: &WorkflowSession) -> anyhow::Result<Value> {
        match self {
            Self::Show(args) => show(session, args).await,
            Self::Node(args) => node(session, args).await,
            Self::Run(args) => run(session, args).await,
            Self::Edit(args) => edit(session, args).await,
            Self::Delete(args) => delete(session, args).await,
        }
    }
}

async fn show(session: &WorkflowSession, args: &ShowArgs) -> anyhow::Result<Value> {
    session
        .open(args.workflow, args.result)
        .await
        .context("failed to load workflow")?;
    if let Some(index) = args.index {
        session
            .select_result(index)
            .await
            .with_context(|| format!("cannot select run #{index}"))?;
    }

    session.resolve_layout().await.context("failed to lay out DAG")?;
    if let Err(error) = session.fetch_annotations().await {
        tracing::warn!(
            target: TRACING_TARGET_COMMAND,
            error = %error,
            "Check and metric values unavailable"
        );
    }

    let output = ShowOutput {
        workflow_id: args.workflow,
        results: session.result_options().await,
        canvas: session.canvas().await,
    };
    Ok(serde_json::to_value(output)?)
}

async fn node(session: &WorkflowSession, args: &NodeArgs) -> anyhow::Result<Value> {
    session
        .open(args.workflow, args.result)
        .await
        .context("failed to load workflow")?;

    let node_type = session
        .click_node(args.node)
        .await
        .with_context(|| format!("cannot inspect node {}", args.node))?;
    tracing::debug!(
        target: TRACING_TARGET_COMMAND,
        node_id = %args.node,
        node_type = %node_type,
        "Node selected"
    );

    Ok(serde_json::to_value(session.side_sheet().await)?)
}

async fn run(session: &WorkflowSession, args: &RunArgs) -> anyhow::Result<Value> {
    let parameters: RunParameters = args.params.iter().cloned().collect();

    session
        .open(args.workflow, None)
        .await
        .context("failed to load workflow")?;
    session
        .trigger_run(&parameters)
        .await
        .context("failed to trigger run")?;

    Ok(json!({
        "workflow_id": args.workflow,
        "triggered": true,
        "parameters": parameters,
    }))
}

async fn edit(session: &WorkflowSession, args: &EditArgs) -> anyhow::Result<Value> {
    session
        .open(args.workflow, None)
        .await
        .context("failed to load workflow")?;

    let current = session
        .store()
        .await
        .active_dag()
        .map(|dag| dag.metadata.schedule.clone())
        .unwrap_or_default();
    let update = args.to_update(&current)?;

    session
        .edit_workflow(&update)
        .await
        .context("failed to update workflow")?;

    Ok(json!({
        "workflow_id": args.workflow,
        "updated": update,
    }))
}

async fn delete(session: &WorkflowSession, args: &DeleteArgs) -> anyhow::Result<Value> {
    if !args.yes {
        bail!("refusing to delete workflow {} without --yes", args.workflow);
    }

    session
        .open(args.workflow, None)
        .await
        .context("failed to load workflow")?;
    session
        .delete_workflow()
        .await
        .context("failed to delete workflow")?;

    Ok(json!({
        "workflow_id": args.workflow,
        "deleted": true,
    }))
}

impl EditArgs {
    /// Builds the update these flags describe, starting from the `current` schedule.
    fn to_update(&self, current: &Schedule) -> anyhow::Result<WorkflowUpdate> {
        let mut builder = WorkflowUpdate::builder();

        if let Some(name) = &self.name {
            builder = builder.with_name(name.clone());
        }
        if let Some(description) = &self.description {
            builder = builder.with_description(description.clone());
        }
        if let Some(k_latest_runs) = self.keep_runs {
            builder = builder.with_retention_policy(RetentionPolicy { k_latest_runs });
        }
        if let Some(schedule) = self.schedule(current) {
            builder = builder.with_schedule(schedule);
        }

        let update = builder.build().context("invalid workflow update")?;
        if update.is_empty() {
            bail!("nothing to change; pass at least one setting");
        }
        Ok(update)
    }

    fn schedule(&self, current: &Schedule) -> Option<Schedule> {
        let mut schedule = if self.manual {
            Schedule::manual()
        } else if let Some(expr) = &self.cron {
            match PeriodicSchedule::from_cron(expr) {
                Ok(period) => Schedule::periodic(&period),
                Err(_) => {
                    tracing::debug!(
                        target: TRACING_TARGET_COMMAND,
                        cron = %expr,
                        "Cron expression has no periodic form, sending it as is"
                    );
                    Schedule {
                        trigger: TriggerType::Periodic,
                        cron_schedule: expr.trim().to_owned(),
                        ..Schedule::default()
                    }
                }
            }
        } else if self.paused.is_some() {
            current.clone()
        } else {
            return None;
        };

        if let Some(paused) = self.paused {
            schedule.paused = paused;
        } else if schedule.trigger == current.trigger {
            schedule.paused = current.paused;
        }
        schedule.disable_manual_trigger = current.disable_manual_trigger;
        Some(schedule)
    }
}

fn parse_param(raw: &str) -> Result<(String, Value), String> {
    let (name, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected name=value, got '{raw}'"))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(format!("parameter name is empty in '{raw}'"));
    }

    let value = serde_json::from_str(value).unwrap_or_else(|_| Value::String(value.to_owned()));
    Ok((name.to_owned(), value))
}

#[cfg(test)]
mod tests {
    use flowdeck_client::mock::{MockCall, MockDagProvider};
    use flowdeck_core::{
        Artifact, ArtifactId, ArtifactType, DagId, ExecState, ExecutionStatus, Operator,
        OperatorId, OperatorSpec, OperatorType, WorkflowDag, WorkflowDagResult, WorkflowSnapshot,
    };
    use jiff::Timestamp;

    use super::*;

    fn edit_args() -> EditArgs {
        EditArgs {
            workflow: WorkflowId::new(),
            name: None,
            description: None,
            cron: None,
            manual: false,
            paused: None,
            keep_runs: None,
        }
    }

    fn fixture() -> (WorkflowId, MockDagProvider) {
        let workflow_id = WorkflowId::new();
        let dag_id = DagId::new();
        let extract = OperatorId::new();
        let table = ArtifactId::new();

        let dag = WorkflowDag::new(dag_id, workflow_id)
            .with_operator(
                Operator::builder()
                    .with_id(extract)
                    .with_name("extract")
                    .with_spec(OperatorSpec::new(OperatorType::Extract))
                    .with_outputs(vec![table])
                    .build()
                    .unwrap(),
            )
            .with_artifact(Artifact::new(table, "rows", ArtifactType::Table));

        let result = WorkflowDagResult {
            id: DagResultId::new(),
            workflow_dag_id: dag_id,
            created_at: Timestamp::from_second(1_700_000_000).unwrap(),
            exec_state: ExecState::with_status(ExecutionStatus::Succeeded),
        };

        let snapshot = WorkflowSnapshot {
            workflow_dags: [(dag_id, dag)].into(),
            workflow_dag_results: vec![result],
        };
        (workflow_id, MockDagProvider::new().with_workflow(workflow_id, snapshot))
    }

    #[test]
    fn test_parse_param() {
        assert_eq!(
            parse_param("limit=10").unwrap(),
            ("limit".to_owned(), serde_json::json!(10))
        );
        assert_eq!(
            parse_param("region=eu-west").unwrap(),
            ("region".to_owned(), Value::String("eu-west".into()))
        );
        assert_eq!(
            parse_param("filter={\"a\":1}").unwrap().1,
            serde_json::json!({"a": 1})
        );
        assert!(parse_param("novalue").is_err());
        assert!(parse_param("=1").is_err());
    }

    #[test]
    fn test_edit_without_changes_is_rejected() {
        assert!(edit_args().to_update(&Schedule::manual()).is_err());
    }

    #[test]
    fn test_edit_cron_builds_periodic_schedule() {
        let args = EditArgs {
            cron: Some("30 2 * * *".into()),
            ..edit_args()
        };
        let update = args.to_update(&Schedule::manual()).unwrap();
        let schedule = update.schedule.unwrap();

        assert_eq!(schedule.trigger, TriggerType::Periodic);
        assert_eq!(schedule.cron_schedule, "30 2 * * *");
        assert!(schedule.period().is_some());
    }

    #[test]
    fn test_edit_pause_keeps_current_schedule() {
        let current = Schedule {
            trigger: TriggerType::Periodic,
            cron_schedule: "0 * * * *".into(),
            ..Schedule::default()
        };
        let args = EditArgs {
            paused: Some(true),
            keep_runs: Some(5),
            ..edit_args()
        };
        let update = args.to_update(&current).unwrap();
        let schedule = update.schedule.unwrap();

        assert!(schedule.paused);
        assert_eq!(schedule.cron_schedule, "0 * * * *");
        assert_eq!(update.retention_policy.unwrap().k_latest_runs, 5);
    }

    #[tokio::test]
    async fn test_show_prints_runs_and_canvas() {
        let (workflow_id, mock) = fixture();
        let session = WorkflowSession::new(mock.into_service());

        let command = Command::Show(ShowArgs {
            workflow: workflow_id,
            result: None,
            index: None,
        });
        let output = command.execute(&session).await.unwrap();

        assert_eq!(output["results"].as_array().unwrap().len(), 1);
        assert_eq!(output["canvas"]["nodes"].as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_run_sends_parameters() {
        let (workflow_id, mock) = fixture();
        let session = WorkflowSession::new(mock.clone().into_service());

        let command = Command::Run(RunArgs {
            workflow: workflow_id,
            params: vec![("limit".into(), serde_json::json!(3))],
        });
        command.execute(&session).await.unwrap();

        assert_eq!(mock.calls(MockCall::TriggerRun), 1);
        assert_eq!(mock.triggered_runs()[0].1["limit"], serde_json::json!(3));
    }

    #[tokio::test]
    async fn test_delete_requires_confirmation() {
        let (workflow_id, mock) = fixture();
        let session = WorkflowSession::new(mock.clone().into_service());

        let command = Command::Delete(DeleteArgs {
            workflow: workflow_id,
            yes: false,
        });
        assert!(command.execute(&session).await.is_err());
        assert_eq!(mock.calls(MockCall::DeleteWorkflow), 0);

        let command = Command::Delete(DeleteArgs {
            workflow: workflow_id,
            yes: true,
        });
        command.execute(&session).await.unwrap();
        assert!(!mock.has_workflow(workflow_id));
    }
}
