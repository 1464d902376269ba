//! Ask command - answer one question from the index.

use console::style;
use serde_json::json;

use crate::config::Settings;
use crate::qa::Assistant;

/// Run the ask command.
pub async fn run(settings: &Settings, question: &str, json: bool) -> anyhow::Result<()> {
    let assistant = Assistant::from_settings(settings)?;
    let answer = assistant.ask(question).await?;

    if json {
        let output = json!({
            "answer": answer.text,
            "refusal": answer.refusal,
            "context": answer.context,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        println!("{} {}", style("Reply:").bold(), answer.text);
    }
    Ok(())
}
