use std::fmt::Write;

use crate::domain::entities::AnalysisContext;

pub struct PromptBuilder;

impl PromptBuilder {
    #[must_use]
    pub fn build(context: &AnalysisContext) -> String {
        let mut prompt = String::with_capacity(4096);

        prompt.push_str(
            "You are the root-cause analyst for a factory-floor workstation that runs \
             line-control and HMI software. A resource alert was just raised. \
             Explain the most likely cause and what the operator should do.\n\n",
        );

        let _ = write!(
            prompt,
            "## Processor\n\
             - captured_at: {}\n\
             - current_usage_percent: {:.1}%\n\
             - five_minute_average_percent: {:.1}%\n\n",
            context.timestamp.format("%Y-%m-%d %H:%M:%S UTC"),
            context.cpu_usage_percent,
            context.five_minute_average,
        );

        if let Some(memory) = context.memory_usage_percent {
            let _ = write!(prompt, "## Memory\n- usage_percent: {memory:.1}%\n\n");
        }

        push_section(&mut prompt, "Top Processes (by CPU)", &context.top_processes);
        push_section(&mut prompt, "Recent Events", &context.recent_events);
        if let Some(disk) = &context.disk_alert {
            push_section(&mut prompt, "Disk Alerts", disk);
        }
        push_section(&mut prompt, "Historical Comparison", &context.historical_comparison);

        prompt.push_str(
            "Respond in plain text. Start with a one-line summary. Use the word \
             \"critical\" only if production is at immediate risk, and \"warning\" \
             for conditions that need attention soon. Then give the likely cause \
             and concrete remediation steps.\n",
        );

        prompt
    }
}

fn push_section(prompt: &mut String, title: &str, body: &str) {
    let _ = writeln!(prompt, "## {title}");
    for line in body.lines().filter(|l| !l.trim().is_empty()) {
        let _ = writeln!(prompt, "- {}", line.trim());
    }
    prompt.push('\n');
}
