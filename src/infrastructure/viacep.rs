use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;

use crate::domain::errors::FormError;
use crate::domain::ports::AddressLookup;
use crate::domain::supplier::{AddressFragment, PostalCode};

/// Body returned by `GET {base}/{cep}/json/`. Unknown codes come back as
/// `{"erro": true}` (older deployments send the string `"true"`).
#[derive(Debug, Deserialize)]
struct ViaCepResponse {
    #[serde(default)]
    logradouro: String,
    #[serde(default)]
    bairro: String,
    #[serde(default)]
    localidade: String,
    #[serde(default)]
    uf: String,
    #[serde(default)]
    erro: Option<Value>,
}

impl ViaCepResponse {
    fn is_not_found(&self) -> bool {
        match &self.erro {
            Some(Value::Bool(flag)) => *flag,
            Some(Value::String(s)) => s.eq_ignore_ascii_case("true"),
            _ => false,
        }
    }
}

pub struct ViaCepClient {
    http: reqwest::Client,
    base_url: String,
}

impl ViaCepClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, FormError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| FormError::Internal(format!("http client: {e}")))?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, code: &PostalCode) -> String {
        format!("{}/{}/json/", self.base_url, code)
    }
}

#[async_trait]
impl AddressLookup for ViaCepClient {
    async fn lookup(&self, postal_code: &PostalCode) -> Result<AddressFragment, FormError> {
        let resp = self
            .http
            .get(self.url(postal_code))
            .send()
            .await
            .map_err(|e| FormError::Unreachable(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(FormError::Unreachable(format!("lookup returned HTTP {status}")));
        }

        let body: ViaCepResponse = resp
            .json()
            .await
            .map_err(|e| FormError::Unreachable(format!("undecodable lookup response: {e}")))?;

        if body.is_not_found() {
            return Err(FormError::NotFound(format!("Postal code {postal_code}")));
        }

        Ok(AddressFragment {
            street: body.logradouro,
            district: body.bairro,
            city: body.localidade,
            state: body.uf,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn code(raw: &str) -> PostalCode {
        PostalCode::parse(raw).expect("valid postal code")
    }

    fn client(base: &str) -> ViaCepClient {
        ViaCepClient::new(base, Duration::from_secs(5)).expect("client")
    }

    #[tokio::test]
    async fn found_code_maps_to_fragment() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/01001000/json/")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"cep":"01001-000","logradouro":"Praça da Sé","complemento":"lado ímpar",
                    "bairro":"Sé","localidade":"São Paulo","uf":"SP"}"#,
            )
            .create_async()
            .await;

        let fragment = client(&server.url()).lookup(&code("01001000")).await.unwrap();

        mock.assert_async().await;
        assert_eq!(
            fragment,
            AddressFragment {
                street: "Praça da Sé".into(),
                district: "Sé".into(),
                city: "São Paulo".into(),
                state: "SP".into(),
            }
        );
    }

    #[tokio::test]
    async fn erro_flag_is_not_found() {
        let mut server = mockito::Server::new_async().await;
        let mut mocks = Vec::new();
        for (path, body) in [
            ("/00000000/json/", r#"{"erro": true}"#),
            ("/99999999/json/", r#"{"erro": "true"}"#),
        ] {
            let mock = server
                .mock("GET", path)
                .with_status(200)
                .with_body(body)
                .create_async()
                .await;
            mocks.push(mock);
        }
        let client = client(&format!("{}/", server.url()));

        for raw in ["00000000", "99999999"] {
            let err = client.lookup(&code(raw)).await.unwrap_err();
            assert!(matches!(err, FormError::NotFound(_)), "{raw}: {err:?}");
        }
    }

    #[tokio::test]
    async fn server_error_is_unreachable() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/01001000/json/")
            .with_status(503)
            .create_async()
            .await;

        let err = client(&server.url()).lookup(&code("01001000")).await.unwrap_err();
        assert!(matches!(err, FormError::Unreachable(_)));
    }

    #[tokio::test]
    async fn garbage_body_is_unreachable() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/01001000/json/")
            .with_status(200)
            .with_body("<html>maintenance</html>")
            .create_async()
            .await;

        let err = client(&server.url()).lookup(&code("01001000")).await.unwrap_err();
        assert!(matches!(err, FormError::Unreachable(_)));
    }

    #[tokio::test]
    async fn refused_connection_is_unreachable() {
        let err = client("http://127.0.0.1:1").lookup(&code("01001000")).await.unwrap_err();
        assert!(matches!(err, FormError::Unreachable(_)));
    }
}
