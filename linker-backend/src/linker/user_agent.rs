//! Turns the stored user-agent string into something a wallet can show
//! ("chrome 120 on macos").

use once_cell::sync::Lazy;
use regex::Regex;

use crate::models::AppInfo;

fn compile(rules: &[(&str, &'static str)]) -> Vec<(Regex, &'static str)> {
    rules
        .iter()
        .map(|(pattern, name)| (Regex::new(&format!("(?i){}", pattern)).unwrap(), *name))
        .collect()
}

/// First match wins, so more specific platforms come first
static PLATFORM_RULES: Lazy<Vec<(Regex, &'static str)>> = Lazy::new(|| {
    compile(&[
        (r"cros", "chromeos"),
        (r"iphone|ios", "iphone"),
        (r"ipad", "ipad"),
        (r"darwin|mac|os\s*x", "macos"),
        (r"win", "windows"),
        (r"android", "android"),
        (r"netbsd", "netbsd"),
        (r"openbsd", "openbsd"),
        (r"freebsd", "freebsd"),
        (r"dragonfly", "dragonflybsd"),
        (r"(sun|i86)os", "solaris"),
        (r"x11|lin(\b|ux)?", "linux"),
        (r"nintendo\s+wii", "wii"),
        (r"irix", "irix"),
        (r"hp-?ux", "hpux"),
        (r"aix", "aix"),
        (r"sco|unix_sv", "sco"),
        (r"bsd", "bsd"),
        (r"amiga", "amiga"),
        (r"blackberry|playbook", "blackberry"),
        (r"symbian", "symbian"),
    ])
});

/// Browser name plus the version that follows it
static BROWSER_RULES: Lazy<Vec<(Regex, &'static str)>> = Lazy::new(|| {
    let rules = [
        (r"googlebot", "google"),
        (r"msnbot", "msn"),
        (r"yahoo", "yahoo"),
        (r"ask jeeves", "ask"),
        (r"aol|america\s+online\s+browser", "aol"),
        (r"opera|opr", "opera"),
        (r"edge|edg", "edge"),
        (r"chrome|crios", "chrome"),
        (r"seamonkey", "seamonkey"),
        (r"firefox|firebird|phoenix|iceweasel", "firefox"),
        (r"galeon", "galeon"),
        (r"safari|version", "safari"),
        (r"webkit", "webkit"),
        (r"camino", "camino"),
        (r"konqueror", "konqueror"),
        (r"k-meleon", "kmeleon"),
        (r"netscape", "netscape"),
        (r"msie|microsoft\s+internet\s+explorer|trident/.+? rv:", "msie"),
        (r"lynx", "lynx"),
        (r"links", "links"),
        (r"baiduspider", "baidu"),
        (r"bingbot", "bing"),
        (r"mozilla", "mozilla"),
    ];
    rules
        .iter()
        .map(|(pattern, name)| {
            let versioned = format!(r"(?i)(?:{})[/\sa-z(]*(\d+[.\da-z]+)?", pattern);
            (Regex::new(&versioned).unwrap(), *name)
        })
        .collect()
});

static LANGUAGE_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?:;\s*|\s+)(\b\w{2}\b(?:-\b\w{2}\b)?)\s*;|(?:\(|\[|;)\s*(\b\w{2}\b(?:-\b\w{2}\b)?)\s*(?:\]|\)|;)",
    )
    .unwrap()
});

pub fn parse(user_agent: &str) -> AppInfo {
    let platform = PLATFORM_RULES
        .iter()
        .find(|(pattern, _)| pattern.is_match(user_agent))
        .map(|(_, name)| name.to_string());

    let (browser, version) = BROWSER_RULES
        .iter()
        .find_map(|(pattern, name)| {
            pattern.captures(user_agent).map(|caps| {
                let version = caps.get(1).map(|m| m.as_str().to_string());
                (Some(name.to_string()), version)
            })
        })
        .unwrap_or((None, None));

    let language = LANGUAGE_PATTERN.captures(user_agent).and_then(|caps| {
        caps.get(1)
            .or_else(|| caps.get(2))
            .map(|m| m.as_str().to_string())
    });

    AppInfo {
        platform,
        browser,
        language,
        version,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chrome_on_macos() {
        let info = parse(
            "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 \
             (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
        );
        assert_eq!(info.platform.as_deref(), Some("macos"));
        assert_eq!(info.browser.as_deref(), Some("chrome"));
        assert_eq!(info.version.as_deref(), Some("120.0.0.0"));
        assert_eq!(info.language, None);
    }

    #[test]
    fn test_firefox_on_windows() {
        let info = parse("Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:121.0) Gecko/20100101 Firefox/121.0");
        assert_eq!(info.platform.as_deref(), Some("windows"));
        assert_eq!(info.browser.as_deref(), Some("firefox"));
        assert_eq!(info.version.as_deref(), Some("121.0"));
    }

    #[test]
    fn test_iphone_beats_mac_os_x() {
        let info = parse(
            "Mozilla/5.0 (iPhone; CPU iPhone OS 17_0 like Mac OS X) AppleWebKit/605.1.15 \
             (KHTML, like Gecko) Version/17.0 Mobile/15E148 Safari/604.1",
        );
        assert_eq!(info.platform.as_deref(), Some("iphone"));
        assert_eq!(info.browser.as_deref(), Some("safari"));
    }

    #[test]
    fn test_language_token() {
        let info = parse("Mozilla/5.0 (X11; U; Linux i686; en-US; rv:1.9.0.1) Gecko/2008072820 Firefox/3.0.1");
        assert_eq!(info.platform.as_deref(), Some("linux"));
        assert_eq!(info.language.as_deref(), Some("en-US"));
        assert_eq!(info.version.as_deref(), Some("3.0.1"));
    }

    #[test]
    fn test_unknown_agent() {
        let info = parse("curl");
        assert_eq!(info, AppInfo::default());
    }
}
