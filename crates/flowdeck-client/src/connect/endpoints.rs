//! [`DagProvider`] implementation over the REST endpoints.

use flowdeck_core::{
    ArtifactId, ArtifactResult, DagLayout, DagResultId, OperatorId, OperatorResult, Result,
    RunParameters, WorkflowId, WorkflowSnapshot, WorkflowUpdate,
};

use super::{ApiClient, TRACING_TARGET};
use crate::provider::DagProvider;
use crate::request::{PositioningRequest, TriggerRequest};

#[async_trait::async_trait]
impl DagProvider for ApiClient {
    async fn get_workflow(&self, workflow_id: WorkflowId) -> Result<WorkflowSnapshot> {
        let url = self.endpoint(&format!("api/workflow/{workflow_id}"))?;
        let snapshot: WorkflowSnapshot = self.get_json(url).await?;

        tracing::debug!(
            target: TRACING_TARGET,
            workflow_id = %workflow_id,
            dags = snapshot.workflow_dags.len(),
            results = snapshot.workflow_dag_results.len(),
            "Fetched workflow"
        );

        Ok(snapshot)
    }

    async fn get_artifact_result(
        &self,
        dag_result_id: DagResultId,
        artifact_id: ArtifactId,
    ) -> Result<ArtifactResult> {
        let url = self.endpoint(&format!(
            "api/artifact_result/{dag_result_id}/{artifact_id}"
        ))?;
        Ok(self.get_json(url).await?)
    }

    async fn get_operator_result(
        &self,
        dag_result_id: DagResultId,
        operator_id: OperatorId,
    ) -> Result<OperatorResult> {
        let url = self.endpoint(&format!(
            "api/operator_result/{dag_result_id}/{operator_id}"
        ))?;
        Ok(self.get_json(url).await?)
    }

    async fn get_positions(&self, request: &PositioningRequest) -> Result<DagLayout> {
        let url = self.endpoint("api/positioning")?;
        Ok(self.post_json(url, request).await?)
    }

    async fn trigger_run(
        &self,
        workflow_id: WorkflowId,
        parameters: &RunParameters,
    ) -> Result<()> {
        let url = self.endpoint(&format!("api/workflow/{workflow_id}/refresh"))?;
        let body = TriggerRequest { parameters };
        self.post_unit(url, Some(&body)).await?;

        tracing::info!(
            target: TRACING_TARGET,
            workflow_id = %workflow_id,
            overrides = parameters.len(),
            "Triggered workflow run"
        );

        Ok(())
    }

    async fn edit_workflow(&self, workflow_id: WorkflowId, update: &WorkflowUpdate) -> Result<()> {
        let url = self.endpoint(&format!("api/workflow/{workflow_id}/edit"))?;
        self.post_unit(url, Some(update)).await?;

        tracing::info!(
            target: TRACING_TARGET,
            workflow_id = %workflow_id,
            "Updated workflow settings"
        );

        Ok(())
    }

    async fn delete_workflow(&self, workflow_id: WorkflowId) -> Result<()> {
        let url = self.endpoint(&format!("api/workflow/{workflow_id}/delete"))?;
        self.post_unit::<()>(url, None).await?;

        tracing::info!(
            target: TRACING_TARGET,
            workflow_id = %workflow_id,
            "Deleted workflow"
        );

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use flowdeck_core::{
        Artifact, ArtifactType, DagId, ErrorKind, ExecutionStatus, NodeId, Operator, OperatorSpec,
        OperatorType, SerializationType, WorkflowDag,
    };
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::ApiConfig;

    const API_KEY: &str = "test-key";

    fn client(server: &MockServer) -> ApiClient {
        ApiClient::new(ApiConfig::new(server.uri(), API_KEY)).unwrap()
    }

    fn authed(verb: &str, route: String) -> wiremock::MockBuilder {
        Mock::given(method(verb))
            .and(path(route))
            .and(header("api-key", API_KEY))
    }

    #[tokio::test]
    async fn test_get_workflow_decodes_snapshot() {
        let server = MockServer::start().await;
        let (workflow_id, dag_id) = (WorkflowId::new(), DagId::new());
        let (extract, users) = (OperatorId::new(), ArtifactId::new());
        let result_id = DagResultId::new();

        let body = json!({
            "workflow_dags": {
                dag_id.to_string(): {
                    "id": dag_id,
                    "workflow_id": workflow_id,
                    "metadata": { "name": "nightly users" },
                    "operators": {
                        extract.to_string(): {
                            "id": extract,
                            "name": "extract users",
                            "spec": { "type": "extract", "extract": { "service": "postgres" } },
                            "outputs": [users],
                        },
                    },
                    "artifacts": {
                        users.to_string(): { "id": users, "name": "users", "type": "table" },
                    },
                },
            },
            "workflow_dag_results": [{
                "id": result_id,
                "workflow_dag_id": dag_id,
                "exec_state": { "status": "succeeded" },
                "created_at": "2024-05-01T12:00:00Z",
            }],
        });
        authed("GET", format!("/api/workflow/{workflow_id}"))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .expect(1)
            .mount(&server)
            .await;

        let snapshot = client(&server).get_workflow(workflow_id).await.unwrap();
        snapshot.validate().unwrap();

        let dag = &snapshot.workflow_dags[&dag_id];
        assert_eq!(dag.metadata.name, "nightly users");
        assert_eq!(dag.operators[&extract].operator_type(), OperatorType::Extract);
        assert_eq!(dag.operators[&extract].spec.integration(), Some("postgres"));
        assert_eq!(dag.artifacts[&users].artifact_type, ArtifactType::Table);

        let run = &snapshot.workflow_dag_results[0];
        assert_eq!(run.id, result_id);
        assert_eq!(run.status(), ExecutionStatus::Succeeded);
    }

    #[tokio::test]
    async fn test_node_results_are_fetched_per_run() {
        let server = MockServer::start().await;
        let (result_id, artifact_id, operator_id) =
            (DagResultId::new(), ArtifactId::new(), OperatorId::new());

        authed("GET", format!("/api/artifact_result/{result_id}/{artifact_id}"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "artifact_type": "bool",
                "serialization_type": "string",
                "content_serialized": "true",
                "exec_state": { "status": "succeeded" },
            })))
            .expect(1)
            .mount(&server)
            .await;
        authed("GET", format!("/api/operator_result/{result_id}/{operator_id}"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "exec_state": { "status": "failed" },
                "logs": { "stdout": "", "stderr": "boom" },
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = client(&server);
        let artifact = client
            .get_artifact_result(result_id, artifact_id)
            .await
            .unwrap();
        assert_eq!(artifact.serialization_type, SerializationType::String);
        assert_eq!(artifact.as_bool(), Some(true));

        let operator = client
            .get_operator_result(result_id, operator_id)
            .await
            .unwrap();
        assert_eq!(operator.exec_state.status, ExecutionStatus::Failed);
        assert_eq!(operator.logs.map(|logs| logs.stderr).as_deref(), Some("boom"));
    }

    #[tokio::test]
    async fn test_positioning_posts_dag_nodes() {
        let server = MockServer::start().await;
        let (extract, users) = (OperatorId::new(), ArtifactId::new());
        let dag = WorkflowDag::new(DagId::new(), WorkflowId::new())
            .with_operator(
                Operator::builder()
                    .with_id(extract)
                    .with_name("extract users")
                    .with_spec(OperatorSpec::new(OperatorType::Extract))
                    .with_outputs(vec![users])
                    .build()
                    .unwrap(),
            )
            .with_artifact(Artifact::new(users, "users", ArtifactType::Table));
        let request = PositioningRequest::from_dag(&dag);

        authed("POST", "/api/positioning".to_owned())
            .and(body_json(&request))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "operator_positions": { extract.to_string(): { "x": 10.0, "y": 20.0 } },
                "artifact_positions": { users.to_string(): { "x": 30.0, "y": 20.0 } },
            })))
            .expect(1)
            .mount(&server)
            .await;

        let layout = client(&server).get_positions(&request).await.unwrap();
        let position = layout.position(NodeId::from(users)).unwrap();
        assert_eq!((position.x, position.y), (30.0, 20.0));
        assert_eq!(layout.len(), 2);
    }

    #[tokio::test]
    async fn test_workflow_mutations() {
        let server = MockServer::start().await;
        let workflow_id = WorkflowId::new();

        authed("POST", format!("/api/workflow/{workflow_id}/refresh"))
            .and(body_json(json!({ "parameters": { "min_rows": 20 } })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .expect(1)
            .mount(&server)
            .await;
        authed("POST", format!("/api/workflow/{workflow_id}/edit"))
            .and(body_json(json!({ "name": "nightly users" })))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;
        authed("POST", format!("/api/workflow/{workflow_id}/delete"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let client = client(&server);
        let parameters = RunParameters::from([("min_rows".to_owned(), json!(20))]);
        client.trigger_run(workflow_id, &parameters).await.unwrap();

        let update = WorkflowUpdate::builder()
            .with_name("nightly users")
            .build()
            .unwrap();
        client.edit_workflow(workflow_id, &update).await.unwrap();
        client.delete_workflow(workflow_id).await.unwrap();

        server.verify().await;
    }

    #[tokio::test]
    async fn test_error_responses_are_classified() {
        let server = MockServer::start().await;
        let (missing, running, locked) = (WorkflowId::new(), WorkflowId::new(), WorkflowId::new());

        authed("GET", format!("/api/workflow/{missing}"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;
        authed("POST", format!("/api/workflow/{running}/delete"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({ "error": "workflow is running" })),
            )
            .mount(&server)
            .await;
        authed("POST", format!("/api/workflow/{locked}/refresh"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let client = client(&server);
        let error = client
            .trigger_run(locked, &RunParameters::new())
            .await
            .unwrap_err();
        assert_eq!(error.kind(), ErrorKind::Authentication);

        let error = client.get_workflow(missing).await.unwrap_err();
        assert_eq!(error.kind(), ErrorKind::NotFound);

        let error = client.delete_workflow(running).await.unwrap_err();
        assert_eq!(error.kind(), ErrorKind::ApiError);
        assert_eq!(error.message.as_deref(), Some("workflow is running"));
    }

    #[tokio::test]
    async fn test_requests_without_key_are_not_matched() {
        let server = MockServer::start().await;
        let workflow_id = WorkflowId::new();
        authed("GET", format!("/api/workflow/{workflow_id}"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .mount(&server)
            .await;

        let other = ApiClient::new(ApiConfig::new(server.uri(), "other-key")).unwrap();
        let error = other.get_workflow(workflow_id).await.unwrap_err();
        assert_eq!(error.kind(), ErrorKind::NotFound);

        let snapshot = client(&server).get_workflow(workflow_id).await.unwrap();
        assert!(snapshot.workflow_dags.is_empty());
    }
}
