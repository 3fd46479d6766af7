// src/report.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::application::services::ProtocolAnalysis;
use crate::domain::alerts::Alert;
use crate::domain::liquidity::{AnomalyResult, RiskBanner, SimilarityScore};
use crate::domain::scoring::{AggregateScore, HealthBand, TrustAssessment};
use crate::shared::errors::ReportError;
use crate::shared::types::ProtocolRecord;
use crate::shared::utils::{format_usd, stable_id};

/// Matches shown in the historical comparison section
const TOP_MATCHES: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReportType {
    Comprehensive,
    Liquidity,
    RiskAssessment,
}

impl ReportType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReportType::Comprehensive => "comprehensive",
            ReportType::Liquidity => "liquidity",
            ReportType::RiskAssessment => "risk-assessment",
        }
    }

    fn includes_liquidity(&self) -> bool {
        matches!(self, ReportType::Comprehensive | ReportType::Liquidity)
    }

    fn includes_risk(&self) -> bool {
        matches!(self, ReportType::Comprehensive | ReportType::RiskAssessment)
    }
}

impl fmt::Display for ReportType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RiskLevel {
    High,
    Medium,
    Low,
}

impl RiskLevel {
    pub fn from_risk_score(score: u8) -> Self {
        if score > 75 {
            RiskLevel::High
        } else if score > 50 {
            RiskLevel::Medium
        } else {
            RiskLevel::Low
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportSummary {
    pub risk_level: RiskLevel,
    pub overview: String,
    pub key_findings: Vec<String>,
    pub recommendations: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum SectionFindings {
    #[serde(rename_all = "camelCase")]
    LiquidityFlow {
        anomaly: Option<AnomalyResult>,
        alerts: Vec<Alert>,
    },
    #[serde(rename_all = "camelCase")]
    HistoricalComparison {
        top_matches: Vec<SimilarityScore>,
        banner: Option<RiskBanner>,
    },
    #[serde(rename_all = "camelCase")]
    ProtocolHealth {
        score: AggregateScore,
        band: HealthBand,
    },
    #[serde(rename_all = "camelCase")]
    RiskComponents { score: AggregateScore },
    #[serde(rename_all = "camelCase")]
    Reputation { assessment: TrustAssessment },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportSection {
    pub title: String,
    pub findings: SectionFindings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProtocolReport {
    pub id: String,
    pub protocol: ProtocolRecord,
    pub report_type: ReportType,
    pub generated_at: DateTime<Utc>,
    pub summary: ReportSummary,
    pub sections: Vec<ReportSection>,
}

impl ProtocolReport {
    /// Same analysis, type and timestamp always give the same report
    pub fn new(analysis: &ProtocolAnalysis, report_type: ReportType, generated_at: DateTime<Utc>) -> Self {
        let protocol = analysis.protocol.clone();
        let id = stable_id(&[protocol.address.as_str(), report_type.as_str(), generated_at.to_rfc3339().as_str()]);

        let summary = ReportSummary {
            risk_level: RiskLevel::from_risk_score(protocol.risk_score),
            overview: format!(
                "This {} report analyzes the {} protocol ({} TVL), which currently has a risk score of {}/100.",
                report_type,
                protocol.name,
                format_usd(protocol.tvl),
                protocol.risk_score
            ),
            key_findings: Self::key_findings(analysis, report_type),
            recommendations: Self::recommendations(analysis, report_type),
        };

        Self {
            id,
            protocol,
            report_type,
            generated_at,
            summary,
            sections: Self::sections(analysis, report_type),
        }
    }

    pub fn to_json(&self) -> Result<String, ReportError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self, ReportError> {
        Ok(serde_json::from_str(json)?)
    }

    /// `<protocol name>_<type>_Report.json` with whitespace replaced
    pub fn file_name(&self) -> String {
        let name: String = self
            .protocol
            .name
            .split_whitespace()
            .collect::<Vec<_>>()
            .join("_");
        format!("{}_{}_Report.json", name, self.report_type)
    }

    fn key_findings(analysis: &ProtocolAnalysis, report_type: ReportType) -> Vec<String> {
        let mut findings = Vec::new();

        if report_type.includes_liquidity() {
            findings.push(match &analysis.anomaly {
                Some(a) if a.is_severe => format!(
                    "Severe TVL outflow: {:.1}% over {:.1}h ({}/h)",
                    a.percentage_change,
                    a.hours_diff,
                    format_usd(a.outflow_rate_per_hour)
                ),
                Some(a) if a.is_anomaly => format!(
                    "Anomalous TVL outflow: {:.1}% over {:.1}h",
                    a.percentage_change, a.hours_diff
                ),
                Some(a) => format!("TVL flows within normal range ({:+.1}%)", a.percentage_change),
                None => "No TVL history available in the lookback window".to_string(),
            });
            if let (Some(top), Some(banner)) = (analysis.similarities.first(), &analysis.banner) {
                findings.push(format!(
                    "Closest historical pattern: {} ({:.1}% similarity, {})",
                    top.event_name, top.similarity, banner.level
                ));
            }
        }

        if report_type.includes_risk() {
            findings.push(format!(
                "Protocol health {}/100 ({})",
                analysis.health.value, analysis.health_band
            ));
            findings.push(format!(
                "Synthetic risk assessment {}/100",
                analysis.risk_components.value
            ));
            if let Some(trust) = &analysis.trust {
                findings.push(format!(
                    "Trust score {}/100 ({}, {})",
                    trust.score.value,
                    trust.band,
                    trust.verification.label()
                ));
            }
        }

        findings
    }

    fn recommendations(analysis: &ProtocolAnalysis, report_type: ReportType) -> Vec<String> {
        let mut recommendations = Vec::new();

        if report_type.includes_liquidity() {
            if let Some(banner) = &analysis.banner {
                recommendations.push(banner.recommendation.clone());
            }
            if analysis.anomaly.is_some_and(|a| a.is_anomaly) {
                recommendations.push("Review large withdrawals and monitor TVL at a shorter interval".to_string());
            }
        }

        if report_type.includes_risk() {
            match RiskLevel::from_risk_score(analysis.protocol.risk_score) {
                RiskLevel::High => {
                    recommendations.push("Limit exposure until the risk score improves".to_string())
                }
                RiskLevel::Medium => {
                    recommendations.push("Keep position sizes moderate and watch for new anomalies".to_string())
                }
                RiskLevel::Low => {}
            }
            if analysis.trust.is_none() {
                recommendations.push("Collect reputation and audit data for a trust assessment".to_string());
            }
        }

        recommendations
    }

    fn sections(analysis: &ProtocolAnalysis, report_type: ReportType) -> Vec<ReportSection> {
        let mut sections = Vec::new();

        if report_type.includes_liquidity() {
            sections.push(ReportSection {
                title: "Liquidity Flow".to_string(),
                findings: SectionFindings::LiquidityFlow {
                    anomaly: analysis.anomaly,
                    alerts: analysis.alerts.clone(),
                },
            });
            sections.push(ReportSection {
                title: "Historical Comparison".to_string(),
                findings: SectionFindings::HistoricalComparison {
                    top_matches: analysis.similarities.iter().take(TOP_MATCHES).cloned().collect(),
                    banner: analysis.banner.clone(),
                },
            });
        }

        if report_type.includes_risk() {
            sections.push(ReportSection {
                title: "Protocol Health".to_string(),
                findings: SectionFindings::ProtocolHealth {
                    score: analysis.health.clone(),
                    band: analysis.health_band,
                },
            });
            sections.push(ReportSection {
                title: "Risk Components".to_string(),
                findings: SectionFindings::RiskComponents {
                    score: analysis.risk_components.clone(),
                },
            });
            if let Some(trust) = &analysis.trust {
                sections.push(ReportSection {
                    title: "Reputation".to_string(),
                    findings: SectionFindings::Reputation {
                        assessment: trust.clone(),
                    },
                });
            }
        }

        sections
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::services::{ProtocolInput, SentinelService};
    use crate::config::Config;
    use crate::domain::liquidity::{FlowWindow, TvlPoint};
    use chrono::TimeZone;

    const NOW: i64 = 1_700_000_000;

    fn analysis() -> ProtocolAnalysis {
        let points = (0..12)
            .map(|i| TvlPoint::new(NOW - (11 - i) * 3600, 2_000_000.0 - i as f64 * 90_000.0))
            .collect();
        let mut input = ProtocolInput::new(ProtocolRecord::new("0xcafe", "Nimbus Bridge", 82, 1_010_000.0));
        input.history = Some(FlowWindow::new("0xcafe", points).unwrap());
        SentinelService::new(&Config::default())
            .unwrap()
            .analyze_protocol(input, NOW)
            .unwrap()
    }

    fn at() -> DateTime<Utc> {
        Utc.timestamp_opt(NOW, 0).single().unwrap()
    }

    #[test]
    fn test_comprehensive_report() {
        let report = ProtocolReport::new(&analysis(), ReportType::Comprehensive, at());
        assert_eq!(report.summary.risk_level, RiskLevel::High);
        assert!(report.summary.overview.starts_with("This comprehensive report analyzes the Nimbus Bridge protocol"));
        let titles: Vec<_> = report.sections.iter().map(|s| s.title.as_str()).collect();
        assert_eq!(titles, vec!["Liquidity Flow", "Historical Comparison", "Protocol Health", "Risk Components"]);
        assert_eq!(report.file_name(), "Nimbus_Bridge_comprehensive_Report.json");
    }

    #[test]
    fn test_report_type_selects_sections() {
        let analysis = analysis();
        let liquidity = ProtocolReport::new(&analysis, ReportType::Liquidity, at());
        assert_eq!(liquidity.sections.len(), 2);
        let risk = ProtocolReport::new(&analysis, ReportType::RiskAssessment, at());
        assert!(risk
            .sections
            .iter()
            .all(|s| !matches!(s.findings, SectionFindings::LiquidityFlow { .. })));
        assert_ne!(liquidity.id, risk.id);
    }

    #[test]
    fn test_risk_level_thresholds() {
        assert_eq!(RiskLevel::from_risk_score(76), RiskLevel::High);
        assert_eq!(RiskLevel::from_risk_score(75), RiskLevel::Medium);
        assert_eq!(RiskLevel::from_risk_score(50), RiskLevel::Low);
    }

    #[test]
    fn test_export_is_repeatable_and_reloads() {
        let analysis = analysis();
        let first = ProtocolReport::new(&analysis, ReportType::Comprehensive, at());
        let second = ProtocolReport::new(&analysis, ReportType::Comprehensive, at());
        assert_eq!(first.id, second.id);

        let json = first.to_json().unwrap();
        assert_eq!(json, second.to_json().unwrap());
        assert!(json.contains("\"reportType\": \"comprehensive\""));
        assert_eq!(ProtocolReport::from_json(&json).unwrap(), first);
    }
}
