use crate::args::ExportArgs;
use crate::cache::LedgerCache;
use crate::commands::Out;
use crate::error::{ErrorType, IntoResult};
use crate::query::date_bounds;
use crate::{export, utils, Config, Result};
use chrono::NaiveDate;
use std::path::PathBuf;

/// Writes the selected transactions and their totals to an `.xlsx` file and returns its path.
/// The file goes to `args.out` when given, otherwise to the `exports` directory of the home
/// directory. An existing file with the same name is overwritten.
pub async fn export(
    config: &Config,
    cache: &mut LedgerCache,
    args: &ExportArgs,
    today: NaiveDate,
) -> Result<Out<PathBuf>> {
    let snapshot = cache.snapshot().await?;
    let scope = args.view.scope(today, date_bounds(&snapshot));
    let view = scope.filter().apply(&snapshot);
    let workbook = export::export(&view, scope)?;

    let dir = args.out.clone().unwrap_or_else(|| config.exports());
    utils::make_dir(&dir).await.pub_result(ErrorType::Io)?;
    let path = dir.join(&workbook.file_name);
    utils::write(&path, &workbook.bytes)
        .await
        .pub_result(ErrorType::Io)?;
    Ok(Out::new(
        format!(
            "Exported {} transactions to {}",
            view.len(),
            path.display()
        ),
        path,
    ))
}
