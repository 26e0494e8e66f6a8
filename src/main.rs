use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Result};
use court_case_lookup::utils::logging;
use court_case_lookup::{CaseLookup, ChromiumLauncher, Config, JsonlOutcomeRecorder};

const USAGE: &str = "用法: court_case_lookup [--config 配置.toml] <案件类型/编号/年份 | 案件类型 编号 年份>";

#[tokio::main]
async fn main() -> Result<()> {
    let mut args: Vec<String> = std::env::args().skip(1).collect();

    // 加载配置
    let config = match args.iter().position(|a| a == "--config") {
        Some(i) if i + 1 < args.len() => {
            let path = args.remove(i + 1);
            args.remove(i);
            Config::from_toml_file(Path::new(&path))?
        }
        Some(_) => bail!("--config 需要一个文件路径\n{}", USAGE),
        None => {
            let config = Config::from_env();
            config.validate()?;
            config
        }
    };

    // 初始化日志
    logging::init(config.verbose_logging);
    logging::log_startup(&config);

    let (case_type, case_number, filing_year) = match args.as_slice() {
        [composite] => (composite.as_str(), "", ""),
        [case_type, number, year] => (case_type.as_str(), number.as_str(), year.as_str()),
        _ => bail!(USAGE),
    };

    let recorder = Arc::new(JsonlOutcomeRecorder::open(&config.outcome_log_file)?);
    let launcher = Arc::new(ChromiumLauncher::new(&config));
    let lookup = CaseLookup::new(config, launcher, recorder)?;

    let result = lookup.search(case_type, case_number, filing_year).await;
    println!("{}", serde_json::to_string_pretty(&result)?);

    Ok(())
}
