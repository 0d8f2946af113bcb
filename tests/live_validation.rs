use std::{env, sync::Once};

use pdfdigest::{
    config,
    inference::{SummaryBounds, build_summarizer, build_translator},
};

static INIT: Once = Once::new();

fn set_default_env(key: &str, value: &str) {
    let needs_value = env::var(key).map(|v| v.trim().is_empty()).unwrap_or(true);
    if needs_value {
        // SAFETY: Tests run serially via Once and we intentionally mutate process env.
        unsafe {
            env::set_var(key, value);
        }
    }
}

fn init_config_once() {
    INIT.call_once(|| {
        set_default_env("INFERENCE_PROVIDER", "ollama");
        set_default_env("OLLAMA_URL", "http://127.0.0.1:11434");
        set_default_env("SOURCE_LANGUAGE", "en");
        set_default_env("TARGET_LANGUAGE", "cs");
        config::init_config();
    });
}

#[tokio::test]
#[ignore = "Requires live Ollama"]
async fn live_ollama_translation_roundtrip() {
    init_config_once();
    let translator = build_translator(config::get_config()).expect("translator");
    let translated = translator
        .translate("The weather is nice today.")
        .await
        .expect("failed to request translation from provider");
    assert!(!translated.trim().is_empty());
}

#[tokio::test]
#[ignore = "Requires live Ollama"]
async fn live_ollama_summary_roundtrip() {
    init_config_once();
    let summarizer = build_summarizer(config::get_config()).expect("summarizer");
    let text = "Rust is a systems programming language focused on safety and speed. ".repeat(20);
    let summary = summarizer
        .summarize(&text, SummaryBounds::new(60, 10))
        .await
        .expect("failed to request summary from provider");
    assert!(!summary.trim().is_empty());
}
