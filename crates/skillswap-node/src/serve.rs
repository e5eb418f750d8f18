//! JSON-lines front end: one call per input line, one answer per output
//! line, in order.

use skillswap_exchange::{Exchange, handle_line};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};

/// Answer calls from `input` until it closes. Returns how many were served.
///
/// # Errors
/// I/O errors on either stream.
pub async fn serve<R, W>(exchange: &Exchange, input: R, mut output: W) -> std::io::Result<u64>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = input.lines();
    let mut served = 0;
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        let mut answer = handle_line(exchange, &line);
        answer.push('\n');
        output.write_all(answer.as_bytes()).await?;
        output.flush().await?;
        served += 1;
    }
    tracing::info!(served, "input closed");
    Ok(served)
}

#[cfg(test)]
mod tests {
    use serde_json::Value;
    use skillswap_types::{ExchangeConfig, Role};

    use super::*;

    #[tokio::test]
    async fn answers_each_line_in_order() {
        let exchange = Exchange::new(ExchangeConfig::default());
        let ana = exchange.register_user("ana", Role::User).unwrap();
        let token = exchange.issue_session(ana).unwrap();
        let input = format!(
            "{{\"id\":1,\"method\":\"getBalance\",\"params\":{{\"sessionToken\":\"{token}\"}}}}\n\
             \n\
             {{\"id\":2,\"method\":\"noSuchCall\",\"params\":{{}}}}\n"
        );

        let mut out = Vec::new();
        let served = serve(&exchange, input.as_bytes(), &mut out).await.unwrap();
        assert_eq!(served, 2);

        let answers: Vec<Value> = String::from_utf8(out)
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(answers[0]["id"], 1);
        assert_eq!(answers[0]["success"], true);
        assert_eq!(answers[0]["credits"], 100);
        assert_eq!(answers[1]["id"], 2);
        assert_eq!(answers[1]["success"], false);
    }
}
