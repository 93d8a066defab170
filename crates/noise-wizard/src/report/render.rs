use super::schema::{EstimationResult, MitigationMeasure};
use std::fmt::Write;

/// Plain-text rendition of a result with every section in a fixed order.
pub fn render_text(result: &EstimationResult) -> String {
    let mut out = String::new();
    // Writing into a String cannot fail.
    let _ = write_report(&mut out, result);
    out
}

fn write_report(out: &mut String, result: &EstimationResult) -> std::fmt::Result {
    writeln!(out, "Noise Impact Assessment")?;
    writeln!(out, "Request: {}", result.request_id)?;
    if let Some(version) = &result.dataset_version {
        writeln!(out, "Dataset: {version}")?;
    }
    if let Some(timestamp) = &result.timestamp {
        writeln!(out, "Calculated: {}", timestamp.format("%Y-%m-%d %H:%M UTC"))?;
    }
    writeln!(out, "Impact: {}", result.impact_band.label())?;

    heading(out, "Noise levels")?;
    writeln!(out, "  Predicted level: {:.1} dB(A)", result.predicted_level_db)?;
    writeln!(out, "  Background level: {:.1} dB(A)", result.background_db)?;
    writeln!(out, "  Noise management level: {:.1} dB(A)", result.nml_db)?;
    writeln!(
        out,
        "  Exceedance over background: {:+.1} dB",
        result.exceed_background_db
    )?;
    writeln!(out, "  Exceedance over NML: {:+.1} dB", result.exceed_nml_db)?;

    heading(out, "Distances")?;
    let distances = &result.distances;
    for (label, value) in [
        (
            "To exceed background",
            distances.distance_to_exceed_background,
        ),
        ("To NML", distances.distance_to_nml),
        ("To highly affected", distances.distance_to_highly_affected),
        ("Affected distance", distances.affected_distance),
    ] {
        match value {
            Some(metres) => writeln!(out, "  {label}: {metres:.0} m")?,
            None => writeln!(out, "  {label}: not reached")?,
        }
    }

    if !result.notification_requirements.is_empty() {
        heading(out, "Notification requirements")?;
        for requirement in &result.notification_requirements {
            writeln!(
                out,
                "  - {}: {} ({})",
                requirement.kind.label(),
                requirement.description,
                requirement.timing
            )?;
            if let Some(threshold) = requirement.distance_threshold {
                writeln!(out, "    within {threshold:.0} m")?;
            }
            bullets(out, &requirement.details, 4)?;
        }
    }

    if !result.stakeholder_requirements.is_empty() {
        heading(out, "Stakeholders")?;
        for stakeholder in &result.stakeholder_requirements {
            writeln!(
                out,
                "  - {} via {} ({})",
                stakeholder.category,
                stakeholder.distinct_methods().join(", "),
                stakeholder.contact_timing
            )?;
            bullets(out, &stakeholder.specific_requirements, 4)?;
        }
    }

    if !result.work_hour_restrictions.is_empty() {
        heading(out, "Work hour restrictions")?;
        for restriction in &result.work_hour_restrictions {
            let consecutive = restriction
                .consecutive_day_limit()
                .map_or_else(|| "unrestricted".to_string(), |days| days.to_string());
            let monthly = restriction
                .monthly_limit()
                .map_or_else(|| "unrestricted".to_string(), |days| days.to_string());
            writeln!(
                out,
                "  - {}: max consecutive days {}, separation {} days, max per month {}",
                restriction.period, consecutive, restriction.separation_required, monthly
            )?;
            bullets(out, &restriction.restrictions, 4)?;
            bullets(out, &restriction.special_conditions, 4)?;
        }
    }

    if !result.respite_periods.is_empty() {
        heading(out, "Respite periods")?;
        for respite in &result.respite_periods {
            writeln!(out, "  - {} {}", respite.id, respite.description)?;
            writeln!(out, "    Evening: {}", respite.evening_restrictions)?;
            writeln!(out, "    Night: {}", respite.night_restrictions)?;
            if !respite.separation_requirements.is_empty() {
                writeln!(out, "    Separation: {}", respite.separation_requirements)?;
            }
        }
    }

    if !result.compliance_requirements.is_empty() {
        heading(out, "Compliance")?;
        for compliance in &result.compliance_requirements {
            let approval = if compliance.approval_needed {
                "approval required"
            } else {
                "no approval required"
            };
            writeln!(
                out,
                "  - {} ({}, {})",
                compliance.category, approval, compliance.timeframe
            )?;
            bullets(out, &compliance.requirements, 4)?;
            if !compliance.reference_numbers.is_empty() {
                writeln!(out, "    Refs: {}", compliance.reference_numbers.join(", "))?;
            }
        }
    }

    if !result.standard_measures.is_empty() {
        heading(out, "Standard mitigation measures")?;
        measures(out, &result.standard_measures)?;
    }
    if !result.additional_measures.is_empty() {
        heading(out, "Additional mitigation measures")?;
        measures(out, &result.additional_measures)?;
    }

    if !result.checklist_items.is_empty() {
        heading(out, "Checklist")?;
        for item in &result.checklist_items {
            let marker = if item.required { "*" } else { " " };
            if item.category.is_empty() {
                writeln!(out, "  [{marker}] {}", item.text)?;
            } else {
                writeln!(out, "  [{marker}] {} ({})", item.text, item.category)?;
            }
        }
    }

    if let Some(trace) = &result.trace {
        heading(out, "Calculation trace")?;
        if !trace.tables_used.is_empty() {
            let tables: Vec<&str> = trace.tables_used.iter().map(String::as_str).collect();
            writeln!(out, "  Tables: {}", tables.join(", "))?;
        }
        for (key, value) in &trace.intermediate_values {
            writeln!(out, "  {key} = {}", value.display())?;
        }
        if !trace.assumptions.is_empty() {
            writeln!(out, "  Assumptions:")?;
            bullets(out, &trace.assumptions, 4)?;
        }
        if !trace.warnings.is_empty() {
            writeln!(out, "  Warnings:")?;
            bullets(out, &trace.warnings, 4)?;
        }
    }

    Ok(())
}

fn heading(out: &mut String, title: &str) -> std::fmt::Result {
    writeln!(out)?;
    writeln!(out, "{title}")?;
    writeln!(out, "{}", "-".repeat(title.len()))
}

fn bullets(out: &mut String, lines: &[String], indent: usize) -> std::fmt::Result {
    for line in lines {
        writeln!(out, "{:indent$}* {line}", "")?;
    }
    Ok(())
}

fn measures(out: &mut String, measures: &[MitigationMeasure]) -> std::fmt::Result {
    for measure in measures {
        let reduction = measure
            .reduction_db
            .map(|db| format!(", -{db:.0} dB"))
            .unwrap_or_default();
        writeln!(out, "  - [{}] {}{}", measure.id, measure.title, reduction)?;
        if !measure.description.is_empty() {
            writeln!(out, "    {}", measure.description)?;
        }
        if !measure.applicable {
            let reason = measure.reason.as_deref().unwrap_or("no reason given");
            writeln!(out, "    Not applicable: {reason}")?;
        }
        if let Some(feasibility) = measure.feasibility {
            writeln!(out, "    Feasibility: {}", feasibility.label())?;
        }
        if let Some(cost) = measure.cost {
            writeln!(out, "    Cost: {}", cost.label())?;
        }
        if !measure.implementation_time.is_empty() {
            writeln!(out, "    Implementation: {}", measure.implementation_time)?;
        }
    }
    Ok(())
}
