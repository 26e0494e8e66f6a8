//! 集成测试共用的假浏览器和结果记录

#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use court_case_lookup::browser::{BrowserDriver, BrowserLauncher, SelectOutcome};
use court_case_lookup::error::DriverError;
use court_case_lookup::models::{CaseRecord, SearchCriteria};
use court_case_lookup::services::{OutcomeRecorder, OutcomeStatus};
use court_case_lookup::{CaseLookup, Config, LookupError};

pub const FORM_HTML: &str = r#"
<html><body>
  <form id="case-form">
    <select name="case_type"><option value="W.P.(C)">W.P.(C)</option></select>
    <input name="case_number" />
    <select name="year"><option>2025</option></select>
    <span id="captcha-code">0000</span>
    <input name="captcha" />
    <button id="search">Submit</button>
  </form>
</body></html>
"#;

pub const TABLE_RESULT_HTML: &str = r#"
<html><body>
  <table class="table">
    <tr><th>S.No.</th><th>Case No.</th><th>Parties</th><th>Filing Date</th><th>Next Hearing Date</th><th>Orders</th></tr>
    <tr>
      <td>1</td>
      <td>W.P.(C) - 11199/2025</td>
      <td>ACME INDUSTRIES LTD VS UNION OF INDIA</td>
      <td>14/07/2025</td>
      <td>02/09/2025</td>
      <td>
        <a href="/app/pdf/order-2.pdf">Order 2</a>
        <a href="https://delhihighcourt.nic.in/app/pdf/order-1.pdf">Order 1</a>
        <a href="/app/pdf/order-2.pdf">Order 2 again</a>
      </td>
    </tr>
  </table>
</body></html>
"#;

pub const UNPARSEABLE_HTML: &str = r#"
<html><body><div id="searchResult"><p>Something unexpected happened</p></div></body></html>
"#;

pub const NOT_FOUND_HTML: &str =
    r#"<html><body><table><tr><td>No record found</td></tr></table></body></html>"#;

/// 站点无结果时的 DataTables 页面：表头仍在，数据行只有一条提示
pub const EMPTY_RESULTS_HTML: &str = r#"
<html><body>
  <div class="dataTables_wrapper">
    <table id="caseTable" class="dataTable">
      <thead>
        <tr>
          <th>S.No.</th>
          <th>Diary No. / Case No.[STATUS]</th>
          <th>Petitioner Vs. Respondent</th>
          <th>Listing Date / Court No.</th>
        </tr>
      </thead>
      <tbody>
        <tr><td colspan="4" class="dataTables_empty">No data available in table</td></tr>
      </tbody>
    </table>
    <div class="dataTables_info" id="caseTable_info">Showing 0 to 0 of 0 entries</div>
  </div>
</body></html>
"#;

pub const REJECTED_HTML: &str =
    r#"<html><body><div class="alert">Invalid Captcha. Please try again.</div></body></html>"#;

/// 一次页面加载的剧本
#[derive(Clone)]
pub struct Attempt {
    pub navigation_fails: bool,
    pub captcha: Option<&'static str>,
    pub result: &'static str,
}

impl Attempt {
    pub fn shows(captcha: &'static str, result: &'static str) -> Self {
        Self {
            navigation_fails: false,
            captcha: Some(captcha),
            result,
        }
    }

    pub fn navigation_failure() -> Self {
        Self {
            navigation_fails: true,
            captcha: None,
            result: "",
        }
    }
}

/// 假浏览器的行为记录
#[derive(Debug, Default)]
pub struct DriverLog {
    pub launches: u32,
    pub navigations: u32,
    pub applied_codes: Vec<String>,
    pub submits: u32,
    pub closes: u32,
    /// 已启动且尚未关闭的会话数
    pub in_flight: u32,
    pub peak_in_flight: u32,
}

/// 按剧本回放的浏览器，第 n 次导航使用第 n 个剧本（超出时重复最后一个）
pub struct FakeDriver {
    attempts: Arc<Vec<Attempt>>,
    hang_on_navigate: bool,
    hang_on_close: bool,
    log: Arc<Mutex<DriverLog>>,
    current: Option<Attempt>,
    submitted: bool,
}

#[async_trait]
impl BrowserDriver for FakeDriver {
    async fn navigate(&mut self, _url: &str, _timeout: Duration) -> Result<(), DriverError> {
        if self.hang_on_navigate {
            tokio::time::sleep(Duration::from_secs(3600)).await;
        }
        let attempt = {
            let mut log = self.log.lock().unwrap();
            let idx = (log.navigations as usize).min(self.attempts.len() - 1);
            log.navigations += 1;
            self.attempts[idx].clone()
        };
        self.submitted = false;
        if attempt.navigation_fails {
            self.current = None;
            return Err(DriverError::Protocol("net::ERR_CONNECTION_RESET".to_string()));
        }
        self.current = Some(attempt);
        Ok(())
    }

    async fn find_text(&mut self, selector: &str) -> Result<Option<String>, DriverError> {
        if selector != "#captcha-code" {
            return Ok(None);
        }
        Ok(self
            .current
            .as_ref()
            .and_then(|a| a.captcha)
            .map(str::to_string))
    }

    async fn fill_field(&mut self, selector: &str, value: &str) -> Result<bool, DriverError> {
        match selector {
            "input[name='case_number']" => Ok(true),
            "input[name='captcha']" => {
                self.log.lock().unwrap().applied_codes.push(value.to_string());
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn select_option(
        &mut self,
        selector: &str,
        value: &str,
    ) -> Result<SelectOutcome, DriverError> {
        match selector {
            "select[name='case_type']" if value == "W.P.(C)" => {
                Ok(SelectOutcome::Selected(value.to_string()))
            }
            "select[name='case_type']" => Ok(SelectOutcome::NoSuchOption),
            "select[name='year']" => Ok(SelectOutcome::Selected(value.to_string())),
            _ => Ok(SelectOutcome::NoSuchElement),
        }
    }

    async fn click(&mut self, selector: &str) -> Result<bool, DriverError> {
        if selector == "button#search" && self.current.is_some() {
            self.submitted = true;
            self.log.lock().unwrap().submits += 1;
            return Ok(true);
        }
        Ok(false)
    }

    async fn html(&mut self) -> Result<String, DriverError> {
        // 让并发的会话在时间上重叠
        tokio::time::sleep(Duration::from_millis(5)).await;
        match (&self.current, self.submitted) {
            (Some(attempt), true) => Ok(attempt.result.to_string()),
            _ => Ok(FORM_HTML.to_string()),
        }
    }

    async fn close(&mut self) -> Result<(), DriverError> {
        {
            let mut log = self.log.lock().unwrap();
            log.closes += 1;
            log.in_flight -= 1;
        }
        if self.hang_on_close {
            tokio::time::sleep(Duration::from_secs(3600)).await;
        }
        Ok(())
    }
}

pub struct FakeLauncher {
    attempts: Arc<Vec<Attempt>>,
    hang_on_navigate: bool,
    hang_on_close: bool,
    pub log: Arc<Mutex<DriverLog>>,
}

impl FakeLauncher {
    pub fn new(attempts: Vec<Attempt>) -> Self {
        Self {
            attempts: Arc::new(attempts),
            hang_on_navigate: false,
            hang_on_close: false,
            log: Arc::new(Mutex::new(DriverLog::default())),
        }
    }

    pub fn hanging() -> Self {
        Self {
            hang_on_navigate: true,
            ..Self::new(vec![Attempt::shows("1234", TABLE_RESULT_HTML)])
        }
    }

    /// 检索正常完成，但关闭浏览器时卡住
    pub fn stuck_on_close() -> Self {
        Self {
            hang_on_close: true,
            ..Self::new(vec![Attempt::shows("1234", TABLE_RESULT_HTML)])
        }
    }
}

#[async_trait]
impl BrowserLauncher for FakeLauncher {
    async fn launch(&self) -> Result<Box<dyn BrowserDriver>, LookupError> {
        {
            let mut log = self.log.lock().unwrap();
            log.launches += 1;
            log.in_flight += 1;
            log.peak_in_flight = log.peak_in_flight.max(log.in_flight);
        }
        Ok(Box::new(FakeDriver {
            attempts: self.attempts.clone(),
            hang_on_navigate: self.hang_on_navigate,
            hang_on_close: self.hang_on_close,
            log: self.log.clone(),
            current: None,
            submitted: false,
        }))
    }
}

/// 只在内存里记下每次调用
#[derive(Default)]
pub struct MemoryRecorder {
    pub calls: Mutex<Vec<(String, OutcomeStatus, Option<String>)>>,
}

#[async_trait]
impl OutcomeRecorder for MemoryRecorder {
    async fn record_outcome(
        &self,
        request_id: &str,
        _criteria: &SearchCriteria,
        status: OutcomeStatus,
        error_message: Option<&str>,
        _record: Option<&CaseRecord>,
    ) -> Result<(), LookupError> {
        self.calls.lock().unwrap().push((
            request_id.to_string(),
            status,
            error_message.map(str::to_string),
        ));
        Ok(())
    }
}

/// 不等待、不限流的测试配置
pub fn fast_config() -> Config {
    Config {
        scraping_delay_secs: 0.0,
        max_retries: 3,
        request_timeout_secs: 5,
        requests_per_minute: 0,
        requests_per_hour: 0,
        result_wait_timeout_ms: 200,
        poll_interval_ms: 5,
        ..Default::default()
    }
}

pub fn lookup_with(
    config: Config,
    launcher: Arc<FakeLauncher>,
) -> (CaseLookup, Arc<MemoryRecorder>) {
    let recorder = Arc::new(MemoryRecorder::default());
    let lookup = CaseLookup::new(config, launcher, recorder.clone()).unwrap();
    (lookup, recorder)
}

pub fn criteria() -> SearchCriteria {
    SearchCriteria::new("W.P.(C)", "11199", "2025").unwrap()
}
