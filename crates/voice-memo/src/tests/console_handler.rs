use crate::{AppCommand, ConsoleHandler};

use tokio::sync::{mpsc, watch};

/// WHAT: Valid lines become commands, bad lines are skipped
/// WHY: A typo must not stop the console loop
#[tokio::test]
#[allow(clippy::unwrap_used)]
async fn given_mixed_lines_when_running_then_valid_commands_forwarded_in_order() {
    // Given: Input with a blank line and a typo
    let input: &[u8] = b"start\n\nfrobnicate\npause\nrename 1 groceries\n";
    let (command_tx, mut command_rx) = mpsc::channel(32);
    let (_shutdown_tx, shutdown_rx) = watch::channel(false);
    let handler = ConsoleHandler::new(command_tx);

    // When: Running until end of input
    handler.run_with(input, shutdown_rx).await.unwrap();
    drop(handler);

    // Then: Parsed commands arrive in order, followed by Quit at end of input
    let mut received = Vec::new();
    while let Some(command) = command_rx.recv().await {
        received.push(command);
    }
    assert_eq!(
        received,
        vec![
            AppCommand::Start,
            AppCommand::Pause,
            AppCommand::Rename {
                index: 0,
                name: "groceries".to_string(),
            },
            AppCommand::Quit,
        ]
    );
}

/// WHAT: Closed command channel surfaces as an error
/// WHY: The console must stop once the application is gone
#[tokio::test]
async fn given_closed_channel_when_sending_then_channel_send_failed() {
    let (command_tx, command_rx) = mpsc::channel(1);
    drop(command_rx);
    let (_shutdown_tx, shutdown_rx) = watch::channel(false);
    let handler = ConsoleHandler::new(command_tx);

    let result = handler.run_with(&b"start\n"[..], shutdown_rx).await;

    assert!(matches!(
        result,
        Err(crate::AppError::ChannelSendFailed { .. })
    ));
}
