use crate::models::{AccountOutput, CommandRow};
use csv_async::{AsyncReaderBuilder, AsyncWriter};
use futures::stream::Stream;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_util::compat::{TokioAsyncReadCompatExt, TokioAsyncWriteCompatExt};

/// Stream commands from async reader
pub fn stream_commands<R: AsyncRead + Unpin + Send + 'static>(
    reader: R,
) -> impl Stream<Item = Result<CommandRow, csv_async::Error>> {
    let compat_reader = reader.compat();
    let csv_reader = AsyncReaderBuilder::new()
        .trim(csv_async::Trim::All)
        .flexible(true)
        .create_deserializer(compat_reader);

    csv_reader.into_deserialize::<CommandRow>()
}

/// Balance report, one row per account. Fields are quoted where needed.
pub async fn write_accounts<W: AsyncWrite + Unpin>(
    writer: W,
    accounts: Vec<AccountOutput>,
) -> Result<(), anyhow::Error> {
    let mut csv_writer = AsyncWriter::from_writer(writer.compat_write());
    csv_writer
        .write_record(["account", "owner", "balance", "credit_limit"])
        .await?;

    for account in accounts {
        csv_writer
            .write_record([
                account.number,
                account.owner,
                format!("{:.2}", account.balance),
                format!("{:.2}", account.credit_limit),
            ])
            .await?;
    }

    csv_writer.flush().await?;
    Ok(())
}
