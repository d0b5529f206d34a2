use axum::{
    extract::{Json, State},
    response::{Html, IntoResponse, Redirect},
};
use curfew_device::DeviceCommand;
use tracing::{info, warn};

use crate::{HttpError, StatusView, page, state::HttpState};

fn current_view(state: &HttpState) -> StatusView {
    let status = state.status.borrow().clone();
    StatusView::new(&status, &state.policy)
}

pub async fn index(State(state): State<HttpState>) -> Html<String> {
    Html(page::render(&current_view(&state)))
}

pub async fn api_status(State(state): State<HttpState>) -> Json<StatusView> {
    Json(current_view(&state))
}

/// Flip the manual override. The next tick picks it up.
pub async fn toggle(State(state): State<HttpState>) -> Result<impl IntoResponse, HttpError> {
    let now = curfew_util::now();
    let enabled = !state.store.load(now).enabled;
    state.store.set_enabled(enabled, now)?;

    info!(enabled, "Enforcement toggled from status page");
    Ok(Redirect::to("/"))
}

pub async fn volume_up(State(state): State<HttpState>) -> Result<impl IntoResponse, HttpError> {
    adjust_volume(&state, DeviceCommand::VolumeUp).await?;
    Ok(Redirect::to("/"))
}

pub async fn volume_down(State(state): State<HttpState>) -> Result<impl IntoResponse, HttpError> {
    adjust_volume(&state, DeviceCommand::VolumeDown).await?;
    Ok(Redirect::to("/"))
}

/// Send one volume step on a session of its own
async fn adjust_volume(state: &HttpState, command: DeviceCommand) -> Result<(), HttpError> {
    let mut session = state
        .device
        .connect(state.policy.device.connect_timeout)
        .await
        .inspect_err(|e| warn!(error = %e, "Volume change: device not reachable"))?;

    let result = session.send(command).await;
    session.close().await;

    match result {
        Ok(_) => {
            info!(command = command.uri(), "Volume changed from status page");
            Ok(())
        }
        Err(e) => {
            warn!(error = %e, "Volume change failed");
            Err(e.into())
        }
    }
}
