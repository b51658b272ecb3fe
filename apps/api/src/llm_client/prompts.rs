// Shared prompt fragments.
// Each generation task defines its own templates in generation/prompts.rs.
// This file contains the cross-cutting rules every task embeds.

/// Truthfulness rule appended to every generation prompt.
pub const NO_FABRICATION_INSTRUCTION: &str = "\
    CRITICAL: Use ONLY facts stated in the candidate's CV. \
    Do NOT invent employers, job titles, dates, degrees, certifications, skills, tools, \
    metrics, or years of experience. Do NOT exaggerate seniority or scope. \
    If the job asks for something the CV does not show, leave it out. \
    Rephrasing, reordering and emphasis are allowed; new facts are not.";

/// Rule suppressing visible step-by-step reasoning in the output.
pub const NO_REASONING_INSTRUCTION: &str = "\
    CRITICAL: Output ONLY the final document. \
    Do NOT show reasoning, planning, notes, or commentary. \
    NEVER emit tags such as <think>, </think>, <reason> or [thinking]. \
    No preamble and no explanation after the document.";
