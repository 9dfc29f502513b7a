//! # 加载模块
//!
//! 把四种来源（URL / Data URL / 本地文件 / 内存字节）统一变成原始字节。
//!
//! - URL 的每一跳（含重定向）都先做主机校验，通过 DNS 校验的地址会被钉进
//!   HTTP 客户端，连接只会落在校验过的地址上。
//! - 只拒绝被明确识别为“非图片”的内容；认不出的签名交给解码器判断。
//! - 取不到映射为 `FetchFailed`，内容不是图片映射为 `DecodeFailed`。不做重试。

use base64::{Engine as _, engine::general_purpose};
use std::net::{IpAddr, SocketAddr};
use std::path::Path;
use std::time::Duration;
use tokio::net::lookup_host;

use super::source::{InputSource, RawImageData};
use super::{ConvertConfig, ImageHandler, LoadError};

/// 流式下载时，攒够这么多字节再做一次签名嗅探。
const SNIFF_LEN: usize = 512;

/// 通过主机校验的请求目标。`pinned` 非空时只允许连接这些地址。
pub(super) struct VettedUrl {
    url: reqwest::Url,
    pinned: Vec<SocketAddr>,
}

impl VettedUrl {
    fn unpinned(url: reqwest::Url) -> Self {
        Self {
            url,
            pinned: Vec::new(),
        }
    }
}

impl<B> ImageHandler<B> {
    /// 按来源加载原始字节。
    pub(crate) async fn load_raw(&self, source: InputSource) -> Result<RawImageData, LoadError> {
        let (bytes, source_hint) = match source {
            InputSource::Url(url) => (self.load_from_url(&url).await?, "url"),
            InputSource::DataUrl(data) => {
                log::info!("📝 解析 Data URL");
                (decode_data_url(&data, self.config.max_file_size)?, "data-url")
            }
            InputSource::FilePath(path) => (self.load_from_file(&path)?, "file"),
            InputSource::Bytes { bytes, file_name } => {
                log::info!("📦 内存图片 {} ({} bytes)", file_name, bytes.len());
                self.check_size(bytes.len() as u64)?;
                (bytes, "bytes")
            }
        };

        reject_non_image(&bytes)?;
        Ok(RawImageData { bytes, source_hint })
    }

    async fn load_from_url(&self, url: &str) -> Result<Vec<u8>, LoadError> {
        log::info!("🌐 下载图片 {}", redact_url(url));

        let parsed = reqwest::Url::parse(url)
            .map_err(|e| LoadError::FetchFailed(format!("URL 格式错误：{}", e)))?;
        let target = Self::vet_url(parsed, &self.config).await?;
        self.fetch(target).await
    }

    fn load_from_file(&self, path: &Path) -> Result<Vec<u8>, LoadError> {
        log::info!("📁 读取本地图片 {}", path.display());

        let metadata = std::fs::metadata(path)
            .map_err(|e| LoadError::FileSystem(format!("无法访问 {}：{}", path.display(), e)))?;
        self.check_size(metadata.len())?;

        std::fs::read(path)
            .map_err(|e| LoadError::FileSystem(format!("无法读取 {}：{}", path.display(), e)))
    }

    fn check_size(&self, len: u64) -> Result<(), LoadError> {
        let limit = self.config.max_file_size;
        if len > limit {
            return Err(LoadError::ResourceLimit(format!(
                "图片过大：{} bytes（限制：{} bytes）",
                len, limit
            )));
        }
        Ok(())
    }

    /// 校验请求目标并决定要钉住的地址。
    ///
    /// 放行内网、IP 字面量或关闭 DNS 校验时不钉地址。
    pub(super) async fn vet_url(
        url: reqwest::Url,
        config: &ConvertConfig,
    ) -> Result<VettedUrl, LoadError> {
        if !matches!(url.scheme(), "http" | "https") {
            return Err(blocked(format!("仅支持 HTTP/HTTPS，收到 {}", url.scheme())));
        }
        if config.allow_private_network {
            return Ok(VettedUrl::unpinned(url));
        }

        let host = url
            .host_str()
            .ok_or_else(|| blocked("URL 缺少主机地址".to_string()))?;

        if host.eq_ignore_ascii_case("localhost")
            || host.eq_ignore_ascii_case("localhost.")
            || host.ends_with(".local")
        {
            return Err(blocked(format!("禁止访问本地主机 {}", host)));
        }

        if let Ok(ip) = host.trim_start_matches('[').trim_end_matches(']').parse::<IpAddr>() {
            if is_blocked_ip(ip) {
                return Err(blocked(format!("禁止访问内网地址 {}", ip)));
            }
            return Ok(VettedUrl::unpinned(url));
        }

        if !config.resolve_dns_for_url_safety {
            return Ok(VettedUrl::unpinned(url));
        }

        let port = url
            .port_or_known_default()
            .ok_or_else(|| blocked("URL 缺少端口".to_string()))?;
        let pinned: Vec<SocketAddr> = lookup_host((host, port))
            .await
            .map_err(|e| LoadError::FetchFailed(format!("无法解析主机 {}：{}", host, e)))?
            .collect();

        if pinned.is_empty() {
            return Err(blocked(format!("主机 {} 没有解析结果", host)));
        }
        if let Some(addr) = pinned.iter().find(|addr| is_blocked_ip(addr.ip())) {
            return Err(blocked(format!("主机 {} 解析到内网地址 {}", host, addr.ip())));
        }

        Ok(VettedUrl { url, pinned })
    }

    fn http_client(target: &VettedUrl, config: &ConvertConfig) -> Result<reqwest::Client, LoadError> {
        let mut builder = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.download_timeout))
            .connect_timeout(Duration::from_secs(config.connect_timeout))
            .redirect(reqwest::redirect::Policy::none());

        if let Some(host) = target.url.host_str().filter(|_| !target.pinned.is_empty()) {
            builder = builder.resolve_to_addrs(host, &target.pinned);
        }

        builder
            .build()
            .map_err(|e| LoadError::FetchFailed(format!("无法创建 HTTP 客户端：{}", e)))
    }

    /// 下载已校验的目标，手动跟随重定向，每一跳重新校验并钉地址。
    pub(super) async fn fetch(&self, first: VettedUrl) -> Result<Vec<u8>, LoadError> {
        let config = &self.config;
        let mut target = first;
        let mut hops = 0;

        let response = loop {
            let client = Self::http_client(&target, config)?;
            log::debug!("📡 GET {}", redact_url(target.url.as_str()));

            let response = client
                .get(target.url.clone())
                .header(reqwest::header::ACCEPT, "image/*")
                .send()
                .await
                .map_err(|e| {
                    if e.is_timeout() {
                        LoadError::FetchFailed(format!("下载超时（{} 秒）", config.download_timeout))
                    } else {
                        LoadError::FetchFailed(format!("请求失败：{}", e.without_url()))
                    }
                })?;

            if !response.status().is_redirection() {
                break response;
            }
            if hops == config.max_redirects {
                return Err(LoadError::FetchFailed(format!(
                    "重定向超过 {} 次",
                    config.max_redirects
                )));
            }
            hops += 1;

            let next = response
                .headers()
                .get(reqwest::header::LOCATION)
                .and_then(|location| location.to_str().ok())
                .and_then(|location| target.url.join(location).ok())
                .ok_or_else(|| LoadError::FetchFailed("重定向缺少有效的 Location".to_string()))?;

            log::debug!("↪️ 跳转到 {}", redact_url(next.as_str()));
            target = Self::vet_url(next, config).await?;
        };

        let status = response.status();
        if !status.is_success() {
            return Err(LoadError::FetchFailed(format!("HTTP {}", status)));
        }

        if let Some(content_type) = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
        {
            if !is_image_mime(content_type) {
                log::warn!("🚫 响应类型不是图片：{}", content_type);
                return Err(LoadError::FetchFailed(format!("不是图片类型：{}", content_type)));
            }
        }

        if let Some(len) = response.content_length() {
            self.check_size(len)?;
        }

        self.read_body(response).await
    }

    /// 流式读取响应体：首包与后续分块各自限时，累计体积受上限约束。
    async fn read_body(&self, mut response: reqwest::Response) -> Result<Vec<u8>, LoadError> {
        let config = &self.config;
        let expected = response.content_length().unwrap_or(0).min(config.max_file_size);
        let mut body = Vec::with_capacity(expected as usize);
        let mut sniffed = false;
        let mut wait = Duration::from_millis(config.stream_first_byte_timeout_ms);

        loop {
            let chunk = match tokio::time::timeout(wait, response.chunk()).await {
                Err(_) if body.is_empty() => {
                    return Err(LoadError::FetchFailed("等待首包超时".to_string()));
                }
                Err(_) => return Err(LoadError::FetchFailed("读取数据超时".to_string())),
                Ok(Err(e)) => {
                    return Err(LoadError::FetchFailed(format!("下载中断：{}", e.without_url())));
                }
                Ok(Ok(None)) => break,
                Ok(Ok(Some(chunk))) => chunk,
            };
            wait = Duration::from_millis(config.stream_chunk_timeout_ms);

            self.check_size((body.len() + chunk.len()) as u64)?;
            body.extend_from_slice(&chunk);

            if !sniffed && body.len() >= SNIFF_LEN {
                reject_non_image(&body)?;
                sniffed = true;
            }
        }

        log::debug!("✅ 下载完成 {} bytes", body.len());
        Ok(body)
    }
}

fn blocked(message: String) -> LoadError {
    log::warn!("🚫 拒绝 URL：{}", message);
    LoadError::FetchFailed(message)
}

/// 本机、内网、链路本地、组播等地址。IPv4 映射/兼容的 IPv6 按内嵌的 IPv4 判断。
fn is_blocked_ip(ip: IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => {
            let [a, b, ..] = v4.octets();
            v4.is_private()
                || v4.is_loopback()
                || v4.is_link_local()
                || v4.is_broadcast()
                || v4.is_documentation()
                || v4.is_unspecified()
                || v4.is_multicast()
                || a == 0
                || (a == 100 && (64..128).contains(&b))
        }
        IpAddr::V6(v6) => match v6.to_ipv4() {
            Some(v4) => is_blocked_ip(IpAddr::V4(v4)),
            None => {
                v6.is_loopback()
                    || v6.is_unspecified()
                    || v6.is_unique_local()
                    || v6.is_unicast_link_local()
                    || v6.is_multicast()
            }
        },
    }
}

fn is_image_mime(content_type: &str) -> bool {
    content_type
        .split(';')
        .next()
        .is_some_and(|base| base.trim().to_ascii_lowercase().starts_with("image/"))
}

/// 只保留 scheme/host/port/path，去掉凭据、query 和 fragment。
pub(crate) fn redact_url(url: &str) -> String {
    let Ok(mut parsed) = reqwest::Url::parse(url) else {
        return "<invalid-url>".to_string();
    };
    parsed.set_query(None);
    parsed.set_fragment(None);
    let _ = parsed.set_username("");
    let _ = parsed.set_password(None);
    parsed.to_string()
}

/// 解析 `data:image/<x>;base64,<payload>`，解码前按长度预估体积。
fn decode_data_url(data: &str, max_file_size: u64) -> Result<Vec<u8>, LoadError> {
    let rest = data.trim().get(5..).unwrap_or_default();
    let (meta, payload) = rest
        .split_once(',')
        .ok_or_else(|| LoadError::DecodeFailed("Data URL 缺少数据段".to_string()))?;

    let mut params = meta.split(';');
    let mime = params.next().unwrap_or_default();
    if !is_image_mime(mime) {
        return Err(LoadError::DecodeFailed(format!("Data URL 不是图片类型：{}", mime)));
    }
    if !params.any(|param| param.eq_ignore_ascii_case("base64")) {
        return Err(LoadError::DecodeFailed("Data URL 必须是 base64 编码".to_string()));
    }

    let payload = payload.trim();
    let estimated = (payload.len() as u64).div_ceil(4).saturating_mul(3);
    if estimated > max_file_size {
        return Err(LoadError::ResourceLimit(format!(
            "Data URL 解码后约 {} bytes（限制：{} bytes）",
            estimated, max_file_size
        )));
    }

    general_purpose::STANDARD
        .decode(payload)
        .map_err(|e| LoadError::DecodeFailed(format!("Base64 解码失败：{}", e)))
}

/// 空内容，或签名被识别为非图片（PDF、ZIP、HTML 等）时拒绝。
///
/// 认不出的签名放行：PNM、TGA 这类格式没有可靠的 magic bytes，由解码器裁决。
fn reject_non_image(bytes: &[u8]) -> Result<(), LoadError> {
    if bytes.is_empty() {
        log::warn!("🚫 图片内容为空");
        return Err(LoadError::DecodeFailed("图片内容为空".to_string()));
    }

    match infer::get(bytes) {
        Some(kind) if kind.matcher_type() != infer::MatcherType::Image => {
            log::warn!("🚫 内容签名为 {}，不是图片", kind.mime_type());
            Err(LoadError::DecodeFailed(format!(
                "内容是 {}，不是图片",
                kind.mime_type()
            )))
        }
        _ => Ok(()),
    }
}
