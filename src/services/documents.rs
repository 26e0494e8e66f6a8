//! 文档服务 - 业务能力层
//!
//! 负责从结果页面收集文档链接，以及按需下载单个文档

use std::collections::HashSet;
use std::sync::LazyLock;
use std::time::Duration;

use reqwest::header::CONTENT_TYPE;
use scraper::{Html, Selector};
use tracing::{debug, info, warn};
use url::Url;

use crate::config::Config;
use crate::error::{DownloadError, LookupError};
use crate::models::DocumentLink;

/// 链接没有文字时使用的展示文本
pub const DEFAULT_LINK_TEXT: &str = "Download PDF";

const DOCUMENT_CONTENT_TYPES: &[&str] = &[
    "application/pdf",
    "application/x-pdf",
    "application/octet-stream",
    "application/msword",
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
];

static ANCHOR_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("a[href]").expect("链接选择器"));

/// 把 href 补全为绝对地址；只接受 http/https
pub fn resolve_document_url(base: &Url, href: &str) -> Option<Url> {
    let href = href.trim();
    if href.is_empty() || href.starts_with('#') {
        return None;
    }
    let url = base.join(href).ok()?;
    matches!(url.scheme(), "http" | "https").then_some(url)
}

/// 收集页面上的文档链接：按首次出现顺序，按绝对地址去重
pub fn collect_document_links(document: &Html, base: &Url) -> Vec<DocumentLink> {
    let mut seen = HashSet::new();
    let mut links = Vec::new();

    for anchor in document.select(&ANCHOR_SELECTOR) {
        let href = anchor.value().attr("href").unwrap_or_default();
        if !href.to_lowercase().contains("pdf") {
            continue;
        }
        let Some(resolved_url) = resolve_document_url(base, href) else {
            continue;
        };
        if !seen.insert(resolved_url.as_str().to_string()) {
            continue;
        }

        let text = anchor.text().collect::<Vec<_>>().join(" ");
        let text = text.split_whitespace().collect::<Vec<_>>().join(" ");
        let display_text = if text.is_empty() {
            anchor
                .value()
                .attr("title")
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .unwrap_or(DEFAULT_LINK_TEXT)
                .to_string()
        } else {
            text
        };

        links.push(DocumentLink {
            display_text,
            resolved_url,
        });
    }

    links
}

/// 下载完成的文档
#[derive(Debug, Clone)]
pub struct DownloadedDocument {
    pub url: Url,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

/// 文档解析与下载服务
///
/// 下载与检索流程相互独立，可以与其他检索并发执行。
#[derive(Clone)]
pub struct DocumentResolver {
    base_url: Url,
    client: reqwest::Client,
    timeout: Duration,
    max_bytes: u64,
}

impl DocumentResolver {
    pub fn new(config: &Config) -> Result<Self, LookupError> {
        let base_url = Url::parse(&config.base_url)
            .map_err(|e| LookupError::Config(format!("base_url 无效: {}", e)))?;
        let client = reqwest::Client::builder()
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| LookupError::Config(format!("无法创建 HTTP 客户端: {}", e)))?;

        Ok(Self {
            base_url,
            client,
            timeout: config.pdf_download_timeout(),
            max_bytes: config.max_pdf_size_bytes(),
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// 解析结果页面中的文档链接
    pub fn resolve_links(&self, html: &str) -> Vec<DocumentLink> {
        let document = Html::parse_document(html);
        collect_document_links(&document, &self.base_url)
    }

    /// 下载文档
    ///
    /// 整个下载过程受时限约束；超过大小上限、类型不对或状态码非 2xx 时不返回任何部分内容。
    pub async fn download(&self, url: &Url) -> Result<DownloadedDocument, DownloadError> {
        if !matches!(url.scheme(), "http" | "https") {
            return Err(DownloadError::UnsupportedScheme(url.scheme().to_string()));
        }

        info!("📥 下载文档: {}", url);
        match tokio::time::timeout(self.timeout, self.fetch(url)).await {
            Ok(Ok(document)) => {
                info!("✓ 文档下载完成: {} ({} 字节)", url, document.bytes.len());
                Ok(document)
            }
            Ok(Err(e)) => {
                warn!("文档下载失败 {}: {}", url, e);
                Err(e)
            }
            Err(_) => {
                warn!("文档下载超时 {}", url);
                Err(DownloadError::Timeout(self.timeout))
            }
        }
    }

    async fn fetch(&self, url: &Url) -> Result<DownloadedDocument, DownloadError> {
        let mut response = self.client.get(url.clone()).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(DownloadError::Status(status.as_u16()));
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.split(';').next().unwrap_or_default().trim().to_lowercase())
            .unwrap_or_default();
        if !DOCUMENT_CONTENT_TYPES.contains(&content_type.as_str()) {
            return Err(DownloadError::BadContentType(content_type));
        }

        // 先看声明的长度，超限时不读取正文
        let declared = response.content_length();
        if let Some(len) = declared {
            if len > self.max_bytes {
                return Err(DownloadError::TooLarge {
                    limit_bytes: self.max_bytes,
                    declared_bytes: Some(len),
                });
            }
        }

        let capacity = declared.unwrap_or(0).min(self.max_bytes) as usize;
        let mut bytes = Vec::with_capacity(capacity);
        while let Some(chunk) = response.chunk().await? {
            if bytes.len() as u64 + chunk.len() as u64 > self.max_bytes {
                return Err(DownloadError::TooLarge {
                    limit_bytes: self.max_bytes,
                    declared_bytes: declared,
                });
            }
            bytes.extend_from_slice(&chunk);
        }
        debug!("读取正文 {} 字节", bytes.len());

        Ok(DownloadedDocument {
            url: url.clone(),
            content_type,
            bytes,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolver() -> DocumentResolver {
        DocumentResolver::new(&Config::default()).unwrap()
    }

    #[test]
    fn relative_links_are_made_absolute_and_deduplicated() {
        let html = r#"
            <a href="/app/pdf/order-1.pdf">Order 1</a>
            <a href="https://delhihighcourt.nic.in/app/pdf/order-1.pdf">Order 1 again</a>
            <a href="app/showpdf?id=2"></a>
            <a href="/app/pdf/order-1.pdf#page=2">Order 1 page 2</a>
            <a href="/about">About</a>
            <a href="javascript:openPdf()">pdf popup</a>
            <a href="mailto:pdf@court.in">Mail</a>
        "#;
        let links = resolver().resolve_links(html);
        let urls: Vec<&str> = links.iter().map(|l| l.resolved_url.as_str()).collect();
        assert_eq!(
            urls,
            vec![
                "https://delhihighcourt.nic.in/app/pdf/order-1.pdf",
                "https://delhihighcourt.nic.in/app/showpdf?id=2",
                "https://delhihighcourt.nic.in/app/pdf/order-1.pdf#page=2",
            ]
        );
        assert_eq!(links[0].display_text, "Order 1");
        assert_eq!(links[1].display_text, DEFAULT_LINK_TEXT);
    }

    #[test]
    fn identical_hrefs_yield_one_link() {
        let html = r#"<a href="a.pdf">first</a><a href="b.pdf">b</a><a href="a.pdf">second</a>"#;
        let links = resolver().resolve_links(html);
        assert_eq!(links.len(), 2);
        assert_eq!(links[0].display_text, "first");
        assert_eq!(links[1].resolved_url.as_str(), "https://delhihighcourt.nic.in/b.pdf");
    }

    #[tokio::test]
    async fn non_http_scheme_is_rejected() {
        let url = Url::parse("file:///etc/passwd.pdf").unwrap();
        let err = resolver().download(&url).await.unwrap_err();
        assert!(matches!(err, DownloadError::UnsupportedScheme(_)));
    }
}
