//! Notifications gRPC 服务实现

use std::sync::Arc;

use notify_bootstrap::{RequestTimer, create_request_span};
use notify_errors::{AppError, AppResult};
use tonic::{Request, Response, Status};
use tracing::{Instrument, error, warn};

use super::conversions::{delivery_kind_from_proto, installation_to_proto, view_to_proto};
use crate::api::proto::notifications::{
    DeleteInstallationRequest, GetInstallationRequest, Installation as ProtoInstallation,
    ListSubscribersRequest, ListSubscribersResponse, RegisterInstallationRequest,
    SubscribeRequest, UnsubscribeRequest, notifications_server::Notifications,
};
use crate::application::{
    DeleteInstallationCommand, GetInstallationQuery, ListSubscribersQuery,
    RegisterInstallationCommand, RegistryHandler, SubscribeCommand, UnsubscribeCommand,
};

const SERVICE_NAME: &str = "notifications.v1.Notifications";

/// Notifications gRPC 服务
pub struct NotificationsServiceImpl {
    handler: Arc<RegistryHandler>,
}

impl NotificationsServiceImpl {
    pub fn new(handler: Arc<RegistryHandler>) -> Self {
        Self { handler }
    }
}

/// 记录请求指标并把错误转换为 gRPC 状态
fn respond<T>(timer: RequestTimer, result: AppResult<T>) -> Result<Response<T>, Status> {
    match result {
        Ok(value) => {
            timer.finish("ok");
            Ok(Response::new(value))
        }
        Err(e) => {
            timer.finish(e.kind());
            match &e {
                AppError::Database(_) | AppError::Internal(_) => {
                    error!(error = %e, "Request failed");
                }
                AppError::Timeout(_) => warn!(error = %e, "Request timed out"),
                _ => warn!(error = %e, "Request rejected"),
            }
            Err(e.into())
        }
    }
}

#[tonic::async_trait]
impl Notifications for NotificationsServiceImpl {
    async fn register_installation(
        &self,
        request: Request<RegisterInstallationRequest>,
    ) -> Result<Response<ProtoInstallation>, Status> {
        let span = create_request_span(&request, "RegisterInstallation");
        let timer = RequestTimer::new(SERVICE_NAME, "RegisterInstallation");
        let req = request.into_inner();

        let metadata = req.metadata.unwrap_or_default();
        let cmd = RegisterInstallationCommand {
            installation_id: req.installation_id,
            delivery_token: req.delivery_token,
            delivery_kind: delivery_kind_from_proto(req.delivery_kind),
            locale: Some(metadata.locale),
            app_version: Some(metadata.app_version),
        };

        let result = self.handler.register(cmd).instrument(span).await;
        respond(timer, result.map(|i| installation_to_proto(&i)))
    }

    async fn delete_installation(
        &self,
        request: Request<DeleteInstallationRequest>,
    ) -> Result<Response<()>, Status> {
        let span = create_request_span(&request, "DeleteInstallation");
        let timer = RequestTimer::new(SERVICE_NAME, "DeleteInstallation");
        let req = request.into_inner();

        let cmd = DeleteInstallationCommand {
            installation_id: req.installation_id,
        };

        let result = self.handler.delete(cmd).instrument(span).await;
        respond(timer, result)
    }

    async fn subscribe(
        &self,
        request: Request<SubscribeRequest>,
    ) -> Result<Response<()>, Status> {
        let span = create_request_span(&request, "Subscribe");
        let timer = RequestTimer::new(SERVICE_NAME, "Subscribe");
        let req = request.into_inner();

        let cmd = SubscribeCommand {
            installation_id: req.installation_id,
            topic_ids: req.topic_ids,
        };

        let result = self.handler.subscribe(cmd).instrument(span).await;
        respond(timer, result)
    }

    async fn unsubscribe(
        &self,
        request: Request<UnsubscribeRequest>,
    ) -> Result<Response<()>, Status> {
        let span = create_request_span(&request, "Unsubscribe");
        let timer = RequestTimer::new(SERVICE_NAME, "Unsubscribe");
        let req = request.into_inner();

        let cmd = UnsubscribeCommand {
            installation_id: req.installation_id,
            topic_ids: req.topic_ids,
        };

        let result = self.handler.unsubscribe(cmd).instrument(span).await;
        respond(timer, result)
    }

    async fn get_installation(
        &self,
        request: Request<GetInstallationRequest>,
    ) -> Result<Response<ProtoInstallation>, Status> {
        let span = create_request_span(&request, "GetInstallation");
        let timer = RequestTimer::new(SERVICE_NAME, "GetInstallation");
        let req = request.into_inner();

        let query = GetInstallationQuery {
            installation_id: req.installation_id,
        };

        let result = self.handler.get(query).instrument(span).await;
        respond(timer, result.map(|view| view_to_proto(&view)))
    }

    async fn list_subscribers(
        &self,
        request: Request<ListSubscribersRequest>,
    ) -> Result<Response<ListSubscribersResponse>, Status> {
        let span = create_request_span(&request, "ListSubscribers");
        let timer = RequestTimer::new(SERVICE_NAME, "ListSubscribers");
        let req = request.into_inner();

        let query = ListSubscribersQuery {
            topic_id: req.topic_id,
        };

        let result = self.handler.list_subscribers(query).instrument(span).await;
        respond(
            timer,
            result.map(|installations| ListSubscribersResponse {
                installations: installations.iter().map(installation_to_proto).collect(),
            }),
        )
    }
}
