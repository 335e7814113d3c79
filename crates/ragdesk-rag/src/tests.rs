//! Snapshot tests for rendered answers

use crate::test_support::ScriptedGenerator;
use crate::{
    Chunker, ChunkerConfig, Embedder, GenerativeAssembler, HashingEmbeddingProvider,
    LocalVectorIndex, RagPipeline, TemplateAssembler,
};
use insta::assert_snapshot;
use ragdesk_core::{
    AnswerAssembler, ChunkKind, ChunkMetadata, GenerationConfig, SearchHit, SearchResult,
    SourceDocument,
};
use std::sync::Arc;
use std::time::Duration;

fn template_pipeline() -> RagPipeline {
    let chunker = Chunker::new(ChunkerConfig {
        max_chunk_chars: 500,
        min_chunk_chars: 1,
        structured: true,
    })
    .unwrap();
    RagPipeline::new(
        chunker,
        Arc::new(Embedder::new(Arc::new(HashingEmbeddingProvider::default()), 32)),
        Arc::new(LocalVectorIndex::in_memory(0.1)),
        Arc::new(TemplateAssembler::new()),
    )
}

fn fragment_hits(texts: &[&str]) -> SearchResult {
    SearchResult {
        hits: texts
            .iter()
            .enumerate()
            .map(|(i, text)| SearchHit {
                id: format!("doc-{:04}", i),
                text: text.to_string(),
                metadata: ChunkMetadata {
                    source_filename: "it.txt".to_string(),
                    section_title: None,
                    kind: ChunkKind::Fragment,
                    sequence_index: i,
                },
                score: 0.9 - i as f32 * 0.2,
            })
            .collect(),
    }
}

#[tokio::test]
async fn test_wifi_answer_snapshot() {
    let pipeline = template_pipeline();
    pipeline
        .ingest(&[
            SourceDocument::plain("wifi.txt", "WiFi network: CorpNet, password: Corp2024!"),
            SourceDocument::plain("printer.txt", "Printer IP: 192.168.1.50"),
        ])
        .await
        .unwrap();

    let answer = pipeline.ask("what is the wifi password").await.unwrap();
    assert_snapshot!(answer.text, @r#"
    📶 **Wi-Fi access**
    ━━━━━━━━━━━━━━━━━━━━
    WiFi network: CorpNet, password: Corp2024!

    💡 Connect to the wireless network with the details above.
    "#);
}

#[tokio::test]
async fn test_google_account_answer_snapshot() {
    let pipeline = template_pipeline();
    pipeline
        .ingest(&[SourceDocument::plain(
            "accounts.txt",
            "**회사 구글 계정**\n-Id : office@gmail.com\n-Pw : Google123!\n**Wi-Fi**\nSSID CorpNet / Corp2024!\n",
        )])
        .await
        .unwrap();

    let answer = pipeline.ask("구글 계정 알려줘").await.unwrap();
    assert_snapshot!(answer.text, @r#"
    📧 **Google account**
    ━━━━━━━━━━━━━━━━━━━━
    -Id : office@gmail.com
    -Pw : Google123!

    💡 Use these details for Gmail and the other Google services.
    🔐 Keep the password somewhere safe.
    "#);
}

#[test]
fn test_section_chunks_snapshot() {
    let chunker = Chunker::new(ChunkerConfig {
        max_chunk_chars: 500,
        min_chunk_chars: 1,
        structured: true,
    })
    .unwrap();
    let chunks = chunker.chunk(
        "accounts.docx",
        "**회사 구글 계정**\n-Id : office@gmail.com\n-Pw : Google123!",
    );

    let listing = chunks
        .iter()
        .map(|c| format!("{} {} {}", c.sequence_index, c.kind, c.text.replace('\n', " | ")))
        .collect::<Vec<_>>()
        .join("\n");
    assert_snapshot!(listing, @r#"
    0 title 회사 구글 계정
    1 standalone -Id : office@gmail.com
    2 item 회사 구글 계정 | -Id : office@gmail.com
    3 standalone -Pw : Google123!
    4 item 회사 구글 계정 | -Pw : Google123!
    5 complete_section 회사 구글 계정 | -Id : office@gmail.com | -Pw : Google123!
    "#);
}

#[test]
fn test_generative_prompt_snapshot() {
    let prompt = GenerativeAssembler::build_prompt(
        "what is the wifi password",
        &fragment_hits(&[
            "WiFi network: CorpNet, password: Corp2024!",
            "Printer IP: 192.168.1.50",
        ]),
    );
    assert_snapshot!(prompt, @r#"
    You are the company's IT assistant. Answer the question using the company information below.

    Company information:
    - WiFi network: CorpNet, password: Corp2024!
    - Printer IP: 192.168.1.50

    Question: what is the wifi password

    Rules:
    1. Answer only from the company information above.
    2. If the information is not there, say explicitly that it is not available.
    3. Answer in the same language as the question.
    4. Keep exact values such as passwords, IDs and IP addresses unchanged.

    Answer:
    "#);
}

#[tokio::test]
async fn test_generative_timeout_snapshot() {
    let assembler = GenerativeAssembler::new(
        Arc::new(ScriptedGenerator::stalling(Duration::from_secs(5))),
        GenerationConfig {
            timeout: Duration::from_millis(20),
            ..Default::default()
        },
    );

    let answer = assembler
        .assemble("printer ip?", &fragment_hits(&["Printer IP: 192.168.1.50"]))
        .await;
    assert_snapshot!(answer, @r#"
    ⚠️ The answer service did not respond within 20ms.
    Most relevant excerpt:
    Printer IP: 192.168.1.50
    "#);
}
