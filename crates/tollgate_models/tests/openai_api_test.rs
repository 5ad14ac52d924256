use tollgate_core::{RequestKind, ResponsePayload};
use tollgate_interface::{ApiRequest, InferenceBackend};
use tollgate_models::OpenAIClient;

#[tokio::test]
#[cfg_attr(not(feature = "api"), ignore)]
async fn test_openai_completion() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    let client = OpenAIClient::new()?;
    let request = ApiRequest::builder()
        .model("gpt-4o-mini")
        .kind(RequestKind::Completion)
        .text("Reply with the single word: ready")
        .max_tokens(5u32)
        .build()?;

    let response = client.call(&request).await?;

    assert!(matches!(response.payload(), ResponsePayload::Completion { text } if !text.is_empty()));
    assert!(*response.usage().total_tokens() > 0);
    Ok(())
}

#[tokio::test]
#[cfg_attr(not(feature = "api"), ignore)]
async fn test_openai_embedding() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    let client = OpenAIClient::new()?;
    let request = ApiRequest::builder()
        .model("text-embedding-3-small")
        .kind(RequestKind::Embedding)
        .text("A rotor assembly comprising a hub and blades.")
        .build()?;

    let response = client.call(&request).await?;

    match response.payload() {
        ResponsePayload::Embedding { vector } => assert_eq!(vector.len(), 1536),
        other => panic!("Expected embedding, got {:?}", other),
    }
    Ok(())
}
