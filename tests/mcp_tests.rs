use async_trait::async_trait;
use rmcp::model::{CallToolResult, Content, ServerCapabilities, ServerInfo};
use rmcp::service::ServiceExt;
use rmcp::{
    handler::server::{router::tool::ToolRouter, wrapper::Parameters},
    schemars, tool, tool_handler, tool_router, ErrorData as McpError, ServerHandler,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::{Arc, Mutex};
use wayfarer::agent::Agent;
use wayfarer::client::{Client, ClientError};
use wayfarer::mcp::{ConnectionError, Connector, McpSession, ToolSession};
use wayfarer::model::{FinishReason, Message, Response, ToolCallRequest};
use wayfarer::options::{ModelOptions, TransportOptions};
use wayfarer::schema::FieldKind;
use wayfarer::tools::{ResultFlag, ToolError, ToolRegistry, ToolService, ToolSpec};

// --- In-memory travel server ---

#[derive(Debug, Deserialize, schemars::JsonSchema)]
#[schemars(crate = "rmcp::schemars")]
pub struct WeatherArgs {
    #[schemars(description = "Full city name")]
    pub city: String,
    #[schemars(description = "Number of forecast days")]
    pub days: i64,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
#[schemars(crate = "rmcp::schemars")]
pub struct HotelArgs {
    #[schemars(description = "Full city name")]
    pub city: String,
}

#[derive(Debug, Clone)]
pub struct TravelTools {
    tool_router: ToolRouter<Self>,
}

#[tool_router]
impl TravelTools {
    pub fn new() -> Self {
        Self {
            tool_router: Self::tool_router(),
        }
    }

    #[tool(description = "Weather forecast for a city")]
    fn get_weather(
        &self,
        Parameters(WeatherArgs { city, days }): Parameters<WeatherArgs>,
    ) -> String {
        json!({"city": city, "days": days, "forecast": "sunny"}).to_string()
    }

    #[tool(description = "Hotels available in a city")]
    fn search_hotels(&self, Parameters(HotelArgs { city: _ }): Parameters<HotelArgs>) -> String {
        "[]".to_string()
    }

    #[tool(description = "Map of a city")]
    fn city_map(
        &self,
        Parameters(HotelArgs { city: _ }): Parameters<HotelArgs>,
    ) -> Result<CallToolResult, McpError> {
        Ok(CallToolResult::success(vec![Content::image(
            "iVBORw0KGgo=",
            "image/png",
        )]))
    }

    #[tool(description = "Book a trip")]
    fn book_trip(&self) -> Result<CallToolResult, McpError> {
        Ok(CallToolResult::error(vec![Content::text(
            "booking service unavailable",
        )]))
    }
}

#[tool_handler]
impl ServerHandler for TravelTools {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            server_info: rmcp::model::Implementation {
                name: "travel-server".into(),
                version: "1.0".into(),
                ..Default::default()
            },
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }
}

async fn connect() -> McpSession<()> {
    let (client_transport, server_transport) = tokio::io::duplex(4096);
    tokio::spawn(async move {
        let service = TravelTools::new()
            .serve(server_transport)
            .await
            .expect("Failed to start server");
        let _ = service.waiting().await;
    });
    let client = ().serve(client_transport).await.expect("Failed to connect");
    McpSession::new(client)
}

struct DuplexConnector;

#[async_trait]
impl Connector for DuplexConnector {
    async fn connect(&self) -> Result<Box<dyn ToolSession>, ConnectionError> {
        Ok(Box::new(connect().await))
    }
}

// --- Session tests ---

#[tokio::test]
async fn test_discovers_tools_with_shapes() {
    let session = connect().await;
    let registry = ToolRegistry::discover(&session).await.unwrap();

    assert_eq!(registry.len(), 4);
    let weather = registry.get("get_weather").unwrap();
    assert_eq!(weather.description, "Weather forecast for a city");
    assert_eq!(weather.shape.title, "get_weatherInput");
    assert_eq!(weather.shape.field("city").unwrap().kind, FieldKind::Text);
    assert_eq!(weather.shape.field("city").unwrap().description, "Full city name");
    assert_eq!(weather.shape.field("days").unwrap().kind, FieldKind::Integer);
    assert!(registry.get("book_trip").unwrap().shape.is_empty());

    drop(registry);
    Box::new(session).close().await;
}

#[tokio::test]
async fn test_call_returns_first_text_segment() {
    let session = connect().await;
    let registry = ToolRegistry::discover(&session).await.unwrap();

    let result = registry
        .get("get_weather")
        .unwrap()
        .invoke(&json!({"city": "Lisbon", "days": "2"}))
        .await
        .unwrap();

    let payload: serde_json::Value = serde_json::from_str(&result.content).unwrap();
    assert_eq!(payload["city"], "Lisbon");
    assert_eq!(payload["days"], 2);
    assert!(!result.remote_error);
}

#[tokio::test]
async fn test_empty_and_error_results_are_data() {
    let session = connect().await;

    let hotels = session
        .call_tool(
            "search_hotels".to_string(),
            json!({"city": "Atlantis"}).as_object().cloned().unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(hotels.content, "[]");

    let booking = session
        .call_tool("book_trip".to_string(), Default::default())
        .await
        .unwrap();
    assert!(booking.remote_error);
    assert_eq!(booking.content, "booking service unavailable");
}

#[tokio::test]
async fn test_unknown_tool_is_a_remote_error() {
    let session = connect().await;
    let err = session
        .call_tool("teleport".to_string(), Default::default())
        .await
        .unwrap_err();
    assert!(matches!(err, ToolError::Remote(_)));
}

#[tokio::test]
async fn test_non_text_first_segment_is_a_failure() {
    let session = connect().await;
    let err = session
        .call_tool(
            "city_map".to_string(),
            json!({"city": "Lisbon"}).as_object().cloned().unwrap(),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, ToolError::NoTextContent(ref name) if name == "city_map"));
}

// --- Full turn over the in-memory server ---

#[derive(Clone)]
struct ScriptedClient {
    responses: Arc<Mutex<Vec<Response>>>,
    requests: Arc<Mutex<Vec<Vec<Message>>>>,
    model_options: ModelOptions<()>,
    transport_options: TransportOptions,
}

#[async_trait]
impl Client for ScriptedClient {
    type ModelProvider = ();

    async fn request(
        &self,
        messages: Vec<Message>,
        _tools: Vec<ToolSpec>,
    ) -> Result<Response, ClientError> {
        self.requests.lock().unwrap().push(messages);
        let mut responses = self.responses.lock().unwrap();
        if responses.is_empty() {
            return Err(ClientError::ProviderError("No more responses".to_string()));
        }
        Ok(responses.remove(0))
    }

    fn model_options(&self) -> &ModelOptions<Self::ModelProvider> {
        &self.model_options
    }

    fn transport_options(&self) -> &TransportOptions {
        &self.transport_options
    }
}

#[tokio::test]
async fn test_turn_over_mcp_session() {
    let client = ScriptedClient {
        responses: Arc::new(Mutex::new(vec![
            Response {
                message: Message::Assistant {
                    content: None,
                    tool_calls: vec![
                        ToolCallRequest {
                            id: "w1".to_string(),
                            name: "get_weather".to_string(),
                            arguments: json!({"city": "Lisbon", "days": 2}),
                        },
                        ToolCallRequest {
                            id: "h1".to_string(),
                            name: "search_hotels".to_string(),
                            arguments: json!({"city": "Lisbon"}),
                        },
                    ],
                },
                usage: None,
                finish: FinishReason::ToolCalls,
            },
            Response {
                message: Message::assistant("Sunny in Lisbon. No hotels were found."),
                usage: None,
                finish: FinishReason::Stop,
            },
        ])),
        requests: Arc::new(Mutex::new(Vec::new())),
        model_options: ModelOptions::new("scripted"),
        transport_options: TransportOptions::default(),
    };
    let agent = Agent::new(client.clone(), DuplexConnector);

    let turn = agent.run_turn("Weekend in Lisbon").await.unwrap();

    assert_eq!(turn.answer, "Sunny in Lisbon. No hotels were found.");
    assert_eq!(turn.conversation.len(), 6);
    let flags: Vec<ResultFlag> = turn.executed.iter().map(|c| c.flag).collect();
    assert_eq!(flags, vec![ResultFlag::Data, ResultFlag::Empty]);

    let requests = client.requests.lock().unwrap();
    match &requests[1][3] {
        Message::ToolResult { call_id, content, .. } => {
            assert_eq!(call_id, "w1");
            assert!(content.contains("sunny"));
        }
        other => panic!("Expected tool result, got {:?}", other),
    }
}
