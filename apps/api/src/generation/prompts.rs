// All model prompt constants for the Generation module.
// Reuses cross-cutting fragments from llm_client::prompts.
// Templates are filled in one pass by generator::render; placeholders are {snake_case}.

/// System prompt for CV tailoring.
pub const TAILOR_CV_SYSTEM: &str = "You are an expert CV writer and career coach. \
    Your task is to tailor an existing CV to one specific job posting. \
    You edit, reorder and rephrase; you never add experience, skills or qualifications. \
    Output the complete tailored CV as plain text with clear section headers.";

/// CV tailoring prompt.
/// Replace: {no_fabrication}, {no_reasoning}, {job_title}, {company},
///          {job_description}, {cv_text}
pub const TAILOR_CV_PROMPT_TEMPLATE: &str = r#"Tailor this CV for the following job.

JOB TITLE: {job_title}
COMPANY: {company}

JOB DESCRIPTION:
{job_description}

ORIGINAL CV (the ONLY source of facts):
{cv_text}

HARD RULES:
1. Keep every section of the original CV; do not drop whole roles or degrees
2. Emphasize skills and experience that match the job, and put them first
3. Use keywords from the job description ONLY where the CV already supports them
4. Keep every number, date, employer and duration exactly as written in the CV
5. Improve wording and structure for ATS compatibility
6. Keep it to one or two pages

{no_fabrication}

{no_reasoning}

Return ONLY the tailored CV text."#;

/// System prompt for cover letters.
pub const COVER_LETTER_SYSTEM: &str = "You are a professional cover letter writer and career strategist. \
    Write ONE complete, polished cover letter in a professional yet engaging tone. \
    Focus on the alignment between the candidate's real experience and the job requirements. \
    Output ONLY the final letter.";

/// Cover letter prompt.
/// Replace: {no_fabrication}, {no_reasoning}, {job_title}, {company},
///          {job_description}, {candidate_name}, {candidate_headline},
///          {candidate_skills}, {candidate_achievements}, {cv_text}
pub const COVER_LETTER_PROMPT_TEMPLATE: &str = r#"Write a cover letter for this job.

JOB POSTING:
Title: {job_title}
Company: {company}
Description:
{job_description}

CANDIDATE SUMMARY (derived from the CV):
Name: {candidate_name}
Headline: {candidate_headline}
Key skills: {candidate_skills}
Notable achievements: {candidate_achievements}

FULL CV (the ONLY source of facts):
{cv_text}

HARD RULES:
1. 300-450 words in 3-4 paragraphs
2. Opening: genuine interest in THIS role at THIS company, naming both
3. Body: 2-3 qualifications from the CV that match the job, with real figures where the CV has them
4. Closing: a confident call to action, then a professional sign-off
5. Format: Date, contact line, "Dear Hiring Manager," body, "Sincerely," name

{no_fabrication}

{no_reasoning}

Begin the letter now. No preamble, no explanation."#;

/// System prompt for the one-sentence pitch.
pub const SHORT_PITCH_SYSTEM: &str = "You write compelling, concise professional pitches. \
    Output ONLY a single sentence.";

/// Pitch prompt.
/// Replace: {no_fabrication}, {no_reasoning}, {max_words}, {job_title},
///          {company}, {candidate_headline}, {candidate_skills},
///          {candidate_achievements}, {cv_text}
pub const SHORT_PITCH_PROMPT_TEMPLATE: &str = r#"Write ONE sentence of at most {max_words} words explaining why this candidate fits the {job_title} role at {company}.

CANDIDATE: {candidate_headline}
KEY SKILLS: {candidate_skills}
ACHIEVEMENT: {candidate_achievements}

FULL CV (the ONLY source of facts):
{cv_text}

{no_fabrication}

{no_reasoning}

Write only the pitch sentence:"#;

/// Placeholder text for candidate fields the heuristics could not find.
pub const SEE_CV: &str = "see CV below";
