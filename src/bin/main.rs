use chatease::{
    config::ChatbotConfig, conversational::Chatbot, memory::SessionHistory,
};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::info;
use tracing_subscriber::EnvFilter;

const WELCOME: &str = "Welcome to ChatEase. Your seamless conversation companion.";
const FAREWELL: &str = "Thank you for chatting with me. Have a great day!";

const ABOUT: &str = "\
This intents-based chatbot classifies what you type into predefined intents
(greeting, farewell, ...) using a TF-IDF vectorizer and a linear classifier,
then replies with one of that intent's responses.

Commands: /history  /clear  /about  /quit";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Logs go to stderr; stdout carries the conversation
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = ChatbotConfig::from_env()?;
    let chatbot = Chatbot::from_config(&config)?;
    let mut history = SessionHistory::new();

    info!(session_id = %history.session_id, "Session started");

    let mut stdout = tokio::io::stdout();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    stdout.write_all(format!("{}\n", WELCOME).as_bytes()).await?;

    loop {
        stdout.write_all(b"You: ").await?;
        stdout.flush().await?;

        let Some(line) = lines.next_line().await? else {
            break;
        };

        let output = match line.trim() {
            "" => continue,
            "/quit" => break,
            "/history" => history.render_table(),
            "/about" => ABOUT.to_string(),
            "/clear" => {
                history.clear();
                "Conversation history cleared.".to_string()
            }
            _ => {
                let outcome = chatbot.converse(&line, &mut history).await?;
                let mut reply = format!("Chatbot: {}", outcome.response());
                if outcome.end_of_session {
                    reply.push('\n');
                    reply.push_str(FAREWELL);
                    stdout.write_all(format!("{}\n", reply).as_bytes()).await?;
                    break;
                }
                reply
            }
        };

        stdout.write_all(format!("{}\n", output).as_bytes()).await?;
    }

    info!(
        session_id = %history.session_id,
        turns = history.len(),
        "Session ended"
    );
    history.clear();

    Ok(())
}
