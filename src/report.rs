use std::fmt::Write;

use chrono::{NaiveDate, NaiveDateTime};

use crate::models::{AlertLevel, AlertReport, AlertedAgreement};

const TITLE: &str = "人月框架协议进度提醒";

const STYLE: &str = "\
body { font-family: 'Microsoft YaHei', Arial, sans-serif; margin: 20px; line-height: 1.6; }
.alert-section { margin: 20px 0; padding: 15px; background-color: #f8f9fa; border-left: 4px solid #007bff; border-radius: 4px; }
.alert-title { font-weight: bold; color: #333; margin-bottom: 10px; font-size: 16px; }
.alert-content { color: #666; }
.person-name { color: #e74c3c; font-weight: bold; }
table { border-collapse: collapse; width: 100%; margin-top: 30px; box-shadow: 0 2px 5px rgba(0,0,0,0.1); }
th, td { border: 1px solid #ddd; padding: 12px; text-align: left; }
th { background-color: #2c3e50; color: white; font-weight: bold; }
tr:nth-child(even) { background-color: #f9f9f9; }
tr:hover { background-color: #f5f5f5; }
.urgent { background-color: #ffe6e6 !important; }
.completed { background-color: #e6ffe6 !important; }
.level-1 { color: #e74c3c; font-weight: bold; }
.level-2 { color: #e67e22; }
.level-3 { color: #f1c40f; }
.level-4 { color: #3498db; }
.level-5 { color: #95a5a6; }
.header { background-color: #34495e; color: white; padding: 20px; border-radius: 5px; margin-bottom: 20px; }
.footer { margin-top: 30px; padding-top: 20px; border-top: 1px solid #eee; color: #7f8c8d; font-size: 12px; }
";

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum ReportFormat {
    Html,
    Json,
}

impl ReportFormat {
    fn extension(self) -> &'static str {
        match self {
            Self::Html => "html",
            Self::Json => "json",
        }
    }
}

pub fn subject(generated_at: NaiveDateTime) -> String {
    format!("{TITLE} - {}", generated_at.format("%Y-%m-%d %H:%M:%S"))
}

pub fn output_file_name(generated_at: NaiveDateTime, format: ReportFormat) -> String {
    format!(
        "{}.{}",
        generated_at.format("%Y%m%d_%H%M%S"),
        format.extension()
    )
}

pub fn urgency_text(level: AlertLevel) -> &'static str {
    match level {
        AlertLevel::Critical => "非常紧急",
        AlertLevel::Urgent => "紧急",
        AlertLevel::Moderate => "中等",
        AlertLevel::Normal => "一般",
        AlertLevel::Low => "较低",
    }
}

fn format_date(date: Option<NaiveDate>) -> String {
    date.map(|date| date.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| "-".to_string())
}

pub fn escape_html(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}

fn mentions(names: &[String]) -> String {
    if names.is_empty() {
        return "无".to_string();
    }
    names
        .iter()
        .map(|name| format!("@{name}"))
        .collect::<Vec<_>>()
        .join(", ")
}

fn write_alert_section(output: &mut String, title: &str, names: &[String]) {
    if names.is_empty() {
        return;
    }

    let people = names
        .iter()
        .map(|name| format!("<span class=\"person-name\">@{}</span>", escape_html(name)))
        .collect::<Vec<_>>()
        .join(", ");

    let _ = writeln!(output, "<div class=\"alert-section\">");
    let _ = writeln!(output, "<div class=\"alert-title\">{title}</div>");
    let _ = writeln!(output, "<div class=\"alert-content\">{people}</div>");
    let _ = writeln!(output, "</div>");
}

fn write_notice(output: &mut String, title: &str, content: &str) {
    let _ = writeln!(output, "<div class=\"alert-section\">");
    let _ = writeln!(output, "<div class=\"alert-title\">{title}</div>");
    let _ = writeln!(output, "<div class=\"alert-content\">{content}</div>");
    let _ = writeln!(output, "</div>");
}

fn row_class(agreement: &AlertedAgreement) -> &'static str {
    if agreement.record.progress.is_completed() {
        "completed"
    } else if agreement.alert_level.is_urgent() {
        "urgent"
    } else {
        ""
    }
}

fn write_table(output: &mut String, agreements: &[AlertedAgreement]) {
    let _ = writeln!(output, "<table>");
    let _ = writeln!(
        output,
        "<tr><th width=\"5%\">序号</th><th width=\"25%\">系统名称</th><th width=\"10%\">责任经办</th>\
         <th width=\"15%\">当前进度</th><th width=\"15%\">上期协议到期</th>\
         <th width=\"15%\">计划立项日期</th><th width=\"15%\">紧急程度</th></tr>"
    );

    for agreement in agreements {
        let record = &agreement.record;
        let level = agreement.alert_level;
        let _ = writeln!(
            output,
            "<tr class=\"{}\"><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td>\
             <td class=\"level-{}\">{}</td></tr>",
            row_class(agreement),
            record.id,
            escape_html(&record.system_name),
            escape_html(&record.responsible_person),
            escape_html(record.progress.label()),
            format_date(record.previous_agreement_expiry),
            format_date(record.planned_approval_date),
            level.value(),
            urgency_text(level)
        );
    }

    let _ = writeln!(output, "</table>");
}

pub fn build_html(report: &AlertReport, department: Option<&str>) -> String {
    let mut output = String::new();
    let scope = escape_html(department.unwrap_or("全部科室"));

    let _ = writeln!(output, "<html>");
    let _ = writeln!(output, "<head>");
    let _ = writeln!(output, "<meta charset=\"utf-8\">");
    let _ = writeln!(output, "<title>{}</title>", escape_html(&subject(report.generated_at)));
    let _ = writeln!(output, "<style>\n{STYLE}</style>");
    let _ = writeln!(output, "</head>");
    let _ = writeln!(output, "<body>");

    let _ = writeln!(output, "<div class=\"header\">");
    let _ = writeln!(output, "<h1>{TITLE}</h1>");
    let _ = writeln!(
        output,
        "<p>生成时间: {}</p>",
        report.generated_at.format("%Y-%m-%d %H:%M:%S")
    );
    let _ = writeln!(output, "</div>");

    if report.has_alerts() {
        let _ = writeln!(output, "<h2>📢 待办事项提醒</h2>");
        write_alert_section(&mut output, "📋 以下同事请及时整理人月框架协议资料：", &report.need_data);
        write_alert_section(&mut output, "📝 以下同事请及时完成事财权审批：", &report.need_approval);
        write_alert_section(&mut output, "🛒 以下同事请及时完成合同采购：", &report.need_purchase);
        write_alert_section(&mut output, "🖋️ 以下同事请及时完成合同用印：", &report.need_seal);
    } else {
        write_notice(&mut output, "✅ 所有事项正常", "目前没有需要紧急处理的事项。");
    }

    if report.agreements.is_empty() {
        write_notice(
            &mut output,
            "⚠️ 未找到相关记录",
            &format!("未找到'{scope}'的相关项目记录。"),
        );
    } else {
        let total = report.agreements.len();
        let _ = writeln!(output, "<h2>📊 {scope}项目清单（共{total}项）</h2>");
        write_table(&mut output, &report.agreements);

        let _ = writeln!(output, "<div class=\"footer\">");
        let _ = writeln!(
            output,
            "<p>📈 统计信息：总计 {} 项 | 已完成 {} 项 | 紧急待办 {} 项</p>",
            total,
            report.completed_count(),
            report.urgent_count()
        );
        let _ = writeln!(
            output,
            "<p>📋 紧急程度说明：非常紧急(7天内) | 紧急(7-14天) | 中等(14-30天) | 一般(30-90天) | 较低(90天以上)</p>"
        );
        let _ = writeln!(output, "<p>✅ 绿色行：已完成项目 | 🔴 红色背景：紧急项目</p>");
        let _ = writeln!(output, "</div>");
    }

    let _ = writeln!(output, "</body>");
    let _ = writeln!(output, "</html>");

    output
}

pub fn build_json(report: &AlertReport) -> anyhow::Result<String> {
    Ok(serde_json::to_string_pretty(report)?)
}

pub fn build_summary(report: &AlertReport) -> String {
    let mut output = String::new();
    let line = "=".repeat(50);

    let _ = writeln!(output);
    let _ = writeln!(output, "{line}");
    let _ = writeln!(output, "          人月框架协议提醒汇总");
    let _ = writeln!(output, "{line}");
    let _ = writeln!(output, "需整理资料: {}", mentions(&report.need_data));
    let _ = writeln!(output, "需完成事财权: {}", mentions(&report.need_approval));
    let _ = writeln!(output, "需完成合同采购: {}", mentions(&report.need_purchase));
    let _ = writeln!(output, "需完成合同用印: {}", mentions(&report.need_seal));
    let _ = writeln!(output, "{}", "-".repeat(50));
    let _ = writeln!(output, "总提醒人数: {}", report.alerted_people());
    let _ = writeln!(output, "表格记录数: {}", report.agreements.len());
    let _ = writeln!(output, "{line}");

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alerts;
    use crate::models::{AgreementRecord, LifecycleStage};
    use chrono::Duration;

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 3, 1)
            .unwrap()
            .and_hms_opt(8, 15, 0)
            .unwrap()
    }

    fn sample_record(id: i32, person: &str, days: Option<i64>, progress: &str) -> AgreementRecord {
        AgreementRecord {
            id,
            system_name: format!("System <{id}>"),
            business_department: "运营管理部".to_string(),
            responsible_department: "运营业务开发科".to_string(),
            previous_agreement_expiry: days.map(|days| now().date() + Duration::days(days)),
            planned_approval_date: None,
            planned_purchase_date: None,
            planned_contract_date: None,
            responsible_person: person.to_string(),
            progress: LifecycleStage::from_label(progress),
        }
    }

    fn sample_report() -> AlertReport {
        alerts::analyze(
            &[
                sample_record(1, "Lin", Some(10), ""),
                sample_record(2, "Zhou & Wu", Some(40), "发起事财权阶段"),
                sample_record(3, "Lin", None, "已完成"),
            ],
            now(),
        )
    }

    #[test]
    fn file_names_and_subject_use_generation_time() {
        assert_eq!(output_file_name(now(), ReportFormat::Html), "20260301_081500.html");
        assert_eq!(output_file_name(now(), ReportFormat::Json), "20260301_081500.json");
        assert_eq!(subject(now()), "人月框架协议进度提醒 - 2026-03-01 08:15:00");
    }

    #[test]
    fn escapes_markup() {
        assert_eq!(
            escape_html("<b>\"A&B\"</b>'"),
            "&lt;b&gt;&quot;A&amp;B&quot;&lt;/b&gt;&#39;"
        );
    }

    #[test]
    fn html_lists_people_and_rows() {
        let html = build_html(&sample_report(), Some("运营业务开发科"));

        assert!(html.contains("以下同事请及时整理人月框架协议资料"));
        assert!(html.contains("<span class=\"person-name\">@Zhou &amp; Wu</span>"));
        assert!(html.contains("System &lt;1&gt;"));
        assert!(html.contains("运营业务开发科项目清单（共3项）"));
        assert!(html.contains("<tr class=\"urgent\">"));
        assert!(html.contains("<tr class=\"completed\">"));
        assert!(html.contains("总计 3 项 | 已完成 1 项 | 紧急待办 1 项"));
        assert!(!html.contains("所有事项正常"));
    }

    #[test]
    fn html_without_alerts_or_records_says_so() {
        let report = alerts::analyze(&[], now());
        let html = build_html(&report, Some("运营业务开发科"));

        assert!(html.contains("所有事项正常"));
        assert!(html.contains("未找到'运营业务开发科'的相关项目记录"));
        assert!(!html.contains("<table>"));
    }

    #[test]
    fn missing_dates_render_as_dash() {
        assert_eq!(format_date(None), "-");
        assert_eq!(format_date(NaiveDate::from_ymd_opt(2026, 1, 5)), "2026-01-05");
    }

    #[test]
    fn summary_mentions_each_list() {
        let summary = build_summary(&sample_report());

        assert!(summary.contains("需整理资料: @Lin\n"));
        assert!(summary.contains("需完成事财权: @Lin, @Zhou & Wu\n"));
        assert!(summary.contains("需完成合同用印: @Lin"));
        assert!(summary.contains("总提醒人数: 2"));
        assert!(summary.contains("表格记录数: 3"));
    }

    #[test]
    fn summary_marks_empty_lists() {
        let summary = build_summary(&alerts::analyze(&[], now()));
        assert!(summary.contains("需整理资料: 无"));
        assert!(summary.contains("总提醒人数: 0"));
    }

    #[test]
    fn json_carries_levels_and_lists() {
        let json = build_json(&sample_report()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["need_seal"], serde_json::json!(["Lin"]));
        assert_eq!(value["agreements"][0]["alert_level"], 2);
        assert_eq!(value["agreements"][2]["progress"], "completed");
    }
}
