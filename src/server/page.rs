//! Html pages of the dashboard.

use std::fmt::Write;

use crate::core::FileReport;

const STYLE: &str = "body{font-family:sans-serif;margin:2em}\
table{border-collapse:collapse;margin-bottom:2em}\
th,td{border:1px solid #ccc;padding:4px 8px;text-align:left}\
td.num{text-align:right}";

pub(crate) fn index(reports: &[FileReport]) -> String {
    let mut body = String::from("<h1>rdr</h1>\n<table>\n<tr><th>file</th><th>keys</th><th>bytes</th></tr>\n");
    for (id, report) in reports.iter().enumerate() {
        let _ = writeln!(
            body,
            "<tr><td><a href=\"/files/{}\">{}</a></td><td class=\"num\">{}</td><td class=\"num\">{}</td></tr>",
            id,
            escape(&report.name),
            report.keys,
            report.bytes
        );
    }
    body.push_str("</table>\n");
    layout("rdr", &body)
}

pub(crate) fn file(report: &FileReport) -> String {
    let summary = &report.summary;
    let mut body = String::new();

    let _ = writeln!(body, "<p><a href=\"/\">files</a></p>");
    let _ = writeln!(body, "<h1>{}</h1>", escape(&report.name));
    let _ = writeln!(
        body,
        "<p>{} &middot; rdb version {} &middot; {} keys &middot; {} bytes &middot; checksum {:?}</p>",
        escape(&report.path),
        report.version,
        report.keys,
        report.bytes,
        report.checksum
    );

    table(
        &mut body,
        "Types",
        &["type", "count", "bytes"],
        summary.types.iter().map(|t| {
            vec![
                escape(t.data_type.as_str()),
                t.count.to_string(),
                t.bytes.to_string(),
            ]
        }),
    );

    table(
        &mut body,
        "Largest keys",
        &["key", "type", "encoding", "bytes", "elements", "expire at"],
        summary.largest_keys.iter().map(|k| {
            vec![
                escape(&k.key),
                escape(k.data_type.as_str()),
                escape(&k.encoding),
                k.bytes.to_string(),
                k.elements.to_string(),
                escape(k.expire_at.as_deref().unwrap_or("")),
            ]
        }),
    );

    table(
        &mut body,
        "Largest prefixes",
        &["prefix", "type", "count", "bytes"],
        summary.largest_prefixes.iter().map(|p| {
            vec![
                escape(&p.prefix),
                escape(p.data_type.as_str()),
                p.count.to_string(),
                p.bytes.to_string(),
            ]
        }),
    );

    table(
        &mut body,
        "Element counts",
        &["type", "elements", "count", "bytes"],
        summary.length_levels.iter().map(|l| {
            vec![
                escape(l.data_type.as_str()),
                escape(l.level.as_str()),
                l.count.to_string(),
                l.bytes.to_string(),
            ]
        }),
    );

    if !report.aux.is_empty() {
        table(
            &mut body,
            "Aux fields",
            &["field", "value"],
            report.aux.iter().map(|(k, v)| vec![escape(k), escape(v)]),
        );
    }

    layout(&report.name, &body)
}

fn table(
    body: &mut String,
    title: &str,
    columns: &[&str],
    rows: impl Iterator<Item = Vec<String>>,
) {
    let _ = writeln!(body, "<h2>{}</h2>\n<table>", title);
    body.push_str("<tr>");
    for column in columns {
        let _ = write!(body, "<th>{}</th>", column);
    }
    body.push_str("</tr>\n");
    for row in rows {
        body.push_str("<tr>");
        for cell in row {
            let _ = write!(body, "<td>{}</td>", cell);
        }
        body.push_str("</tr>\n");
    }
    body.push_str("</table>\n");
}

fn layout(title: &str, body: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n<title>{}</title>\n<style>{}</style>\n</head>\n<body>\n{}</body>\n</html>\n",
        escape(title),
        STYLE,
        body
    )
}

fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_markup() {
        assert_eq!(escape("<a href='x'>&</a>"), "&lt;a href=&#39;x&#39;&gt;&amp;&lt;/a&gt;");
    }

    #[test]
    fn index_links_files() {
        let html = index(&[]);
        assert!(html.starts_with("<!DOCTYPE html>"));
        assert!(html.contains("<th>file</th>"));
    }
}
