//! Typed wrapper over the BoardVista REST API.
//!
//! Each method maps to exactly one endpoint, decodes the uniform response
//! envelope, and turns `success: false` answers into [`ClientError::Api`]
//! with the server's status and message preserved.

use reqwest::{RequestBuilder, Response};
use serde::de::DeserializeOwned;
use uuid::Uuid;

use vista_shared::api::{
    ApiResponse, AuthResponse, ChatDetail, ChatSummary, CreateChatRequest, CreateListingRequest,
    CreateReviewRequest, ListingResponse, LoginRequest, PagedResponse, RegisterRequest,
    ReviewResponse, ReviewStats, SendMessageRequest, UpdateListingRequest, UpdateProfileRequest,
    UpdateReviewRequest, UserProfile,
};
use vista_shared::types::{Facility, Gender, MessageType};

use crate::error::ClientError;
use crate::token_store::TokenStore;

/// Search parameters for [`ApiGateway::list_listings`].
#[derive(Debug, Clone, Default)]
pub struct ListingSearch {
    pub gender: Option<Gender>,
    pub city: Option<String>,
    pub min_price: Option<i64>,
    pub max_price: Option<i64>,
    pub facilities: Vec<Facility>,
    pub is_verified: Option<bool>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

impl ListingSearch {
    /// Serialize into the query parameters the server expects.
    fn to_query(&self) -> Vec<(&'static str, String)> {
        let mut query = Vec::new();
        if let Some(gender) = self.gender {
            query.push(("gender", gender.as_str().to_string()));
        }
        if let Some(city) = &self.city {
            query.push(("city", city.clone()));
        }
        if let Some(min) = self.min_price {
            query.push(("minPrice", min.to_string()));
        }
        if let Some(max) = self.max_price {
            query.push(("maxPrice", max.to_string()));
        }
        if !self.facilities.is_empty() {
            let tags: Vec<&str> = self.facilities.iter().map(Facility::as_str).collect();
            query.push(("facilities", tags.join(",")));
        }
        if let Some(verified) = self.is_verified {
            query.push(("isVerified", verified.to_string()));
        }
        if let Some(page) = self.page {
            query.push(("page", page.to_string()));
        }
        if let Some(limit) = self.limit {
            query.push(("limit", limit.to_string()));
        }
        query
    }
}

/// HTTP gateway to a BoardVista server.
pub struct ApiGateway {
    base_url: String,
    http: reqwest::Client,
    tokens: TokenStore,
}

impl ApiGateway {
    /// `base_url` is the server root, e.g. `http://localhost:8080`.
    pub fn new(base_url: impl Into<String>, tokens: TokenStore) -> Self {
        let base_url: String = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http: reqwest::Client::new(),
            tokens,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Attach the stored bearer token, failing when the user never logged in.
    fn authed(&self, builder: RequestBuilder) -> Result<RequestBuilder, ClientError> {
        let token = self.tokens.load()?.ok_or(ClientError::MissingToken)?;
        Ok(builder.bearer_auth(token))
    }

    // ------------------------------------------------------------------
    // Accounts
    // ------------------------------------------------------------------

    /// Register an account and persist the issued token.
    pub async fn register(&self, req: &RegisterRequest) -> Result<AuthResponse, ClientError> {
        let response = self
            .http
            .post(self.url("/api/users/register"))
            .json(req)
            .send()
            .await?;
        let auth: AuthResponse = decode(response).await?;
        self.tokens.save(&auth.token)?;
        Ok(auth)
    }

    /// Log in and persist the issued token.
    pub async fn login(&self, req: &LoginRequest) -> Result<AuthResponse, ClientError> {
        let response = self
            .http
            .post(self.url("/api/users/login"))
            .json(req)
            .send()
            .await?;
        let auth: AuthResponse = decode(response).await?;
        self.tokens.save(&auth.token)?;
        Ok(auth)
    }

    /// Forget the stored token.
    pub fn logout(&self) -> Result<(), ClientError> {
        self.tokens.clear()
    }

    pub async fn me(&self) -> Result<UserProfile, ClientError> {
        let request = self.authed(self.http.get(self.url("/api/users/me")))?;
        decode(request.send().await?).await
    }

    pub async fn update_profile(
        &self,
        req: &UpdateProfileRequest,
    ) -> Result<UserProfile, ClientError> {
        let request = self.authed(self.http.put(self.url("/api/users/profile")))?;
        decode(request.json(req).send().await?).await
    }

    // ------------------------------------------------------------------
    // Listings
    // ------------------------------------------------------------------

    pub async fn list_listings(
        &self,
        search: &ListingSearch,
    ) -> Result<PagedResponse<ListingResponse>, ClientError> {
        let response = self
            .http
            .get(self.url("/api/boarding"))
            .query(&search.to_query())
            .send()
            .await?;
        decode_page(response).await
    }

    pub async fn get_listing(&self, id: Uuid) -> Result<ListingResponse, ClientError> {
        let response = self
            .http
            .get(self.url(&format!("/api/boarding/{id}")))
            .send()
            .await?;
        decode(response).await
    }

    pub async fn create_listing(
        &self,
        req: &CreateListingRequest,
    ) -> Result<ListingResponse, ClientError> {
        let request = self.authed(self.http.post(self.url("/api/boarding")))?;
        decode(request.json(req).send().await?).await
    }

    pub async fn update_listing(
        &self,
        id: Uuid,
        req: &UpdateListingRequest,
    ) -> Result<ListingResponse, ClientError> {
        let request = self.authed(self.http.put(self.url(&format!("/api/boarding/{id}"))))?;
        decode(request.json(req).send().await?).await
    }

    pub async fn delete_listing(&self, id: Uuid) -> Result<(), ClientError> {
        let request = self.authed(self.http.delete(self.url(&format!("/api/boarding/{id}"))))?;
        decode::<serde_json::Value>(request.send().await?).await?;
        Ok(())
    }

    pub async fn nearby_listings(
        &self,
        latitude: f64,
        longitude: f64,
        max_distance_m: Option<f64>,
    ) -> Result<Vec<ListingResponse>, ClientError> {
        let mut query = vec![
            ("latitude", latitude.to_string()),
            ("longitude", longitude.to_string()),
        ];
        if let Some(distance) = max_distance_m {
            query.push(("maxDistance", distance.to_string()));
        }

        let response = self
            .http
            .get(self.url("/api/boarding/search/nearby"))
            .query(&query)
            .send()
            .await?;
        decode(response).await
    }

    pub async fn my_listings(&self) -> Result<Vec<ListingResponse>, ClientError> {
        let request = self.authed(self.http.get(self.url("/api/boarding/owner/my-listings")))?;
        decode(request.send().await?).await
    }

    // ------------------------------------------------------------------
    // Reviews
    // ------------------------------------------------------------------

    pub async fn list_reviews(
        &self,
        listing_id: Option<Uuid>,
        page: Option<u32>,
        limit: Option<u32>,
    ) -> Result<PagedResponse<ReviewResponse>, ClientError> {
        let mut query = Vec::new();
        if let Some(listing_id) = listing_id {
            query.push(("listingId", listing_id.to_string()));
        }
        if let Some(page) = page {
            query.push(("page", page.to_string()));
        }
        if let Some(limit) = limit {
            query.push(("limit", limit.to_string()));
        }

        let response = self
            .http
            .get(self.url("/api/reviews"))
            .query(&query)
            .send()
            .await?;
        decode_page(response).await
    }

    pub async fn create_review(
        &self,
        req: &CreateReviewRequest,
    ) -> Result<ReviewResponse, ClientError> {
        let request = self.authed(self.http.post(self.url("/api/reviews")))?;
        decode(request.json(req).send().await?).await
    }

    pub async fn update_review(
        &self,
        id: Uuid,
        req: &UpdateReviewRequest,
    ) -> Result<ReviewResponse, ClientError> {
        let request = self.authed(self.http.put(self.url(&format!("/api/reviews/{id}"))))?;
        decode(request.json(req).send().await?).await
    }

    pub async fn delete_review(&self, id: Uuid) -> Result<(), ClientError> {
        let request = self.authed(self.http.delete(self.url(&format!("/api/reviews/{id}"))))?;
        decode::<serde_json::Value>(request.send().await?).await?;
        Ok(())
    }

    pub async fn review_stats(&self, listing_id: Uuid) -> Result<ReviewStats, ClientError> {
        let response = self
            .http
            .get(self.url(&format!("/api/reviews/stats/{listing_id}")))
            .send()
            .await?;
        decode(response).await
    }

    // ------------------------------------------------------------------
    // Chats
    // ------------------------------------------------------------------

    pub async fn list_chats(&self) -> Result<Vec<ChatSummary>, ClientError> {
        let request = self.authed(self.http.get(self.url("/api/chat")))?;
        decode(request.send().await?).await
    }

    pub async fn create_chat(
        &self,
        listing_id: Uuid,
        participant_id: Uuid,
    ) -> Result<ChatSummary, ClientError> {
        let request = self.authed(self.http.post(self.url("/api/chat")))?;
        let body = CreateChatRequest {
            listing_id,
            participant_id,
        };
        decode(request.json(&body).send().await?).await
    }

    pub async fn get_chat(&self, id: Uuid) -> Result<ChatDetail, ClientError> {
        let request = self.authed(self.http.get(self.url(&format!("/api/chat/{id}"))))?;
        decode(request.send().await?).await
    }

    pub async fn send_message(
        &self,
        chat_id: Uuid,
        content: impl Into<String>,
        message_type: MessageType,
        file_url: Option<String>,
    ) -> Result<ChatDetail, ClientError> {
        let request = self.authed(self.http.post(self.url(&format!("/api/chat/{chat_id}"))))?;
        let body = SendMessageRequest {
            content: content.into(),
            message_type,
            file_url,
        };
        decode(request.json(&body).send().await?).await
    }

    pub async fn mark_messages_read(&self, chat_id: Uuid) -> Result<ChatDetail, ClientError> {
        let request = self.authed(self.http.put(self.url(&format!("/api/chat/{chat_id}"))))?;
        decode(request.send().await?).await
    }
}

// ---------------------------------------------------------------------------
// Envelope decoding
// ---------------------------------------------------------------------------

/// Decode a `{success, data}` envelope, or surface the server's error
/// message.
async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, ClientError> {
    let status = response.status();
    if !status.is_success() {
        return Err(api_error(status.as_u16(), response).await);
    }

    let envelope: ApiResponse<T> = response.json().await?;
    envelope.data.ok_or(ClientError::Api {
        status: status.as_u16(),
        message: "Response carried no data".to_string(),
    })
}

/// Decode a paginated envelope.
async fn decode_page<T: DeserializeOwned>(
    response: Response,
) -> Result<PagedResponse<T>, ClientError> {
    let status = response.status();
    if !status.is_success() {
        return Err(api_error(status.as_u16(), response).await);
    }
    Ok(response.json().await?)
}

/// Extract the failure message from an error envelope.
async fn api_error(status: u16, response: Response) -> ClientError {
    let body: serde_json::Value = response.json().await.unwrap_or(serde_json::Value::Null);

    let message = body
        .get("message")
        .and_then(|m| m.as_str())
        .map(str::to_string)
        .or_else(|| {
            // Field-level validation errors: join them into one line.
            body.get("errors").and_then(|errors| errors.as_array()).map(|errors| {
                errors
                    .iter()
                    .filter_map(|e| {
                        let field = e.get("field")?.as_str()?;
                        let message = e.get("message")?.as_str()?;
                        Some(format!("{field}: {message}"))
                    })
                    .collect::<Vec<_>>()
                    .join("; ")
            })
        })
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| "Request failed".to_string());

    ClientError::Api { status, message }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn search_query_uses_wire_names() {
        let search = ListingSearch {
            gender: Some(Gender::Male),
            city: Some("Vavuniya".into()),
            min_price: Some(20_000),
            max_price: Some(40_000),
            facilities: vec![Facility::WiFi, Facility::Parking],
            is_verified: Some(true),
            page: Some(2),
            limit: Some(5),
        };

        let query = search.to_query();
        assert!(query.contains(&("gender", "male".to_string())));
        assert!(query.contains(&("minPrice", "20000".to_string())));
        assert!(query.contains(&("maxPrice", "40000".to_string())));
        assert!(query.contains(&("facilities", "WiFi,Parking".to_string())));
        assert!(query.contains(&("isVerified", "true".to_string())));
        assert!(query.contains(&("page", "2".to_string())));
    }

    #[test]
    fn empty_search_sends_no_params() {
        assert!(ListingSearch::default().to_query().is_empty());
    }

    #[test]
    fn base_url_trailing_slash_is_normalized() {
        let dir = tempfile::tempdir().unwrap();
        let gateway = ApiGateway::new(
            "http://localhost:8080/",
            TokenStore::at_path(dir.path().join("token")),
        );
        assert_eq!(gateway.url("/api/boarding"), "http://localhost:8080/api/boarding");
    }
}
