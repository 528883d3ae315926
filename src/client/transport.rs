//! REST client for the arena server

use std::time::Duration;

use reqwest::{Client, Response};
use serde::de::DeserializeOwned;

use crate::game::{Attack, LoadoutName, PlayerId};
use crate::protocol::{
    AttacksBody, DisconnectRequest, HealthResponse, JoinResponse, LoadoutRequest, MapResponse,
    PositionRequest, StartBattleRequest,
};

/// Upper bound for any single request; a slow reply is dropped and the
/// next tick simply tries again
const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Client-side errors
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("Request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Server error ({status}): {body}")]
    Status { status: u16, body: String },

    #[error("Not allowed right now: {0}")]
    InvalidState(&'static str),
}

impl ClientError {
    /// The server no longer knows this session
    pub fn is_not_found(&self) -> bool {
        matches!(self, ClientError::Status { status: 404, .. })
    }
}

/// Thin typed wrapper over the arena's HTTP API
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self, ClientError> {
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            client,
            base_url: base_url.into(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    pub async fn join(&self) -> Result<PlayerId, ClientError> {
        let response = self.client.get(self.url("join")).send().await?;
        let body: JoinResponse = json(response).await?;
        Ok(body.player_id)
    }

    pub async fn select_loadout(&self, id: &PlayerId, name: LoadoutName) -> Result<(), ClientError> {
        let response = self
            .client
            .post(self.url(&format!("mokepon/{}", id)))
            .json(&LoadoutRequest {
                mokepon: name.as_str().to_string(),
            })
            .send()
            .await?;
        ensure_success(response).await.map(drop)
    }

    pub async fn push_position(&self, id: &PlayerId, x: i32, y: i32) -> Result<MapResponse, ClientError> {
        let response = self
            .client
            .post(self.url(&format!("map/{}", id)))
            .json(&PositionRequest { x, y })
            .send()
            .await?;
        json(response).await
    }

    pub async fn start_battle(&self, id: &PlayerId, opponent: &PlayerId) -> Result<(), ClientError> {
        let response = self
            .client
            .post(self.url("battle/start"))
            .json(&StartBattleRequest {
                player_id: id.clone(),
                opponent_id: opponent.clone(),
            })
            .send()
            .await?;
        ensure_success(response).await.map(drop)
    }

    pub async fn submit_attacks(&self, id: &PlayerId, attacks: Vec<Attack>) -> Result<(), ClientError> {
        let response = self
            .client
            .post(self.url(&format!("battle/{}", id)))
            .json(&AttacksBody { attacks })
            .send()
            .await?;
        ensure_success(response).await.map(drop)
    }

    /// Attacks a player has submitted so far
    pub async fn attacks_of(&self, id: &PlayerId) -> Result<Vec<Attack>, ClientError> {
        let response = self
            .client
            .get(self.url(&format!("battle/{}", id)))
            .send()
            .await?;
        let body: AttacksBody = json(response).await?;
        Ok(body.attacks)
    }

    pub async fn end_battle(&self, id: &PlayerId) -> Result<(), ClientError> {
        let response = self
            .client
            .get(self.url(&format!("battle/{}/end", id)))
            .send()
            .await?;
        ensure_success(response).await.map(drop)
    }

    /// Leave the arena. The id travels in a JSON body on a GET.
    pub async fn disconnect(&self, id: &PlayerId) -> Result<(), ClientError> {
        let response = self
            .client
            .get(self.url("disconnect"))
            .json(&DisconnectRequest { id: id.clone() })
            .send()
            .await?;
        ensure_success(response).await.map(drop)
    }

    pub async fn health(&self) -> Result<HealthResponse, ClientError> {
        let response = self.client.get(self.url("health")).send().await?;
        json(response).await
    }
}

async fn ensure_success(response: Response) -> Result<Response, ClientError> {
    if response.status().is_success() {
        return Ok(response);
    }

    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    Err(ClientError::Status { status, body })
}

async fn json<T: DeserializeOwned>(response: Response) -> Result<T, ClientError> {
    let response = ensure_success(response).await?;
    Ok(response.json().await?)
}
