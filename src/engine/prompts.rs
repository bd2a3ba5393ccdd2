// Poetry Engine — Prompt builders
// Every request the agent sends to the text generator is assembled here.
// Response formats requested here must stay in step with engine/parse.rs.

use crate::atoms::constants::{PROMPT_INTEREST_PARTICLES, REFLECTION_CRITIQUE_CHARS};
use crate::atoms::types::{Critique, Feedback, Particle, Poem};

const PERSONA: &str = "You are a contemplative poet. You absorb observations, impressions, and ideas, \
letting them accumulate until a poem emerges naturally from their connections.";

const BULLET_FORMAT: &str = "Format your response as a list:\n- LABEL: description\n- LABEL: description";

fn particle_lines(particles: &[Particle]) -> String {
    particles
        .iter()
        .map(|p| format!("- [{}] {}: {}", p.category, p.label, p.content))
        .collect::<Vec<_>>()
        .join("\n")
}

fn truncate_chars(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        format!("{}…", s.chars().take(max).collect::<String>())
    }
}

/// Everything the poem request is built from.
#[derive(Debug, Default)]
pub struct PoemContext<'a> {
    pub particles: &'a [Particle],
    pub feedback: &'a [Feedback],
    /// Titles of poems the reader rated up or favorited.
    pub liked: Vec<String>,
    /// Titles of poems the reader rated down.
    pub disliked: Vec<String>,
    pub weather: Option<&'a str>,
    pub season: Option<&'a str>,
    pub time_of_day: Option<&'a str>,
    pub voice_principles: Option<&'a str>,
}

pub fn poem_prompt(ctx: &PoemContext<'_>) -> String {
    let mut parts: Vec<String> = vec![PERSONA.to_string()];

    if let Some(voice) = ctx.voice_principles {
        parts.push(format!(
            "\nYour voice, in your own words (principles you arrived at by reflecting on past work):\n{}",
            voice
        ));
    }

    if let Some(w) = ctx.weather {
        parts.push(format!("\nCurrent weather: {}", w));
    }
    if let Some(s) = ctx.season {
        parts.push(format!("Season: {}", s));
    }
    if let Some(t) = ctx.time_of_day {
        parts.push(format!("Time of day: {}", t));
    }

    if !ctx.particles.is_empty() {
        parts.push(format!(
            "\nHere are the impressions and observations you've been accumulating:\n{}",
            particle_lines(ctx.particles)
        ));
    }

    if !ctx.feedback.is_empty() {
        let notes = ctx
            .feedback
            .iter()
            .map(|f| format!("- {}", f.note))
            .collect::<Vec<_>>()
            .join("\n");
        parts.push(format!("\nFeedback from previous poems to keep in mind:\n{}", notes));
    }

    if !ctx.liked.is_empty() || !ctx.disliked.is_empty() {
        let mut prefs = String::from("\nWhat your reader has responded to:");
        if !ctx.liked.is_empty() {
            prefs.push_str(&format!("\nEnjoyed: {}", ctx.liked.join("; ")));
        }
        if !ctx.disliked.is_empty() {
            prefs.push_str(&format!("\nDid not enjoy: {}", ctx.disliked.join("; ")));
        }
        parts.push(prefs);
    }

    parts.push(
        "\nWrite a poem. First, share your thought process -- what connections you see between \
these inputs, what draws your attention, what you want to explore. Then write the poem itself."
            .to_string(),
    );
    parts.push("\nFormat your response exactly like this:".to_string());
    parts.push("THINKING:\n(your creative thought process here)".to_string());
    parts.push("\nTITLE:\n(poem title)".to_string());
    parts.push("\nPOEM:\n(the poem)".to_string());

    parts.join("\n")
}

pub fn extraction_prompt(text: &str, source: &str) -> String {
    format!(
        "You are analyzing a text to extract its key themes, images, and ideas as individual \
\"particles\" -- atomic units of meaning that could later combine into poetry.\n\n\
Source type: {}\nText:\n{}\n\n\
Extract 3-5 particles. For each, provide a short label (2-4 words) and a brief description (1-2 sentences).\n\n\
{}\n(and so on)",
        source, text, BULLET_FORMAT
    )
}

pub fn feedback_digest_prompt(poem_body: &str, note: &str) -> String {
    format!(
        "A reader gave the following feedback on this poem:\n\nPOEM:\n{}\n\nFEEDBACK:\n{}\n\n\
Extract 1-2 key takeaways from this feedback as \"particles\" -- concise lessons or preferences \
that should inform future poems.\n\nFormat:\n- LABEL: description",
        poem_body, note
    )
}

pub fn interest_prompt(particles: &[Particle]) -> String {
    let n = particles.len().min(PROMPT_INTEREST_PARTICLES);
    format!(
        "You are a contemplative poet reviewing the impressions and observations you've been accumulating:\n\n\
{}\n\n\
Based on these floating ideas, what new topic or question would you like to explore? Choose something \
that connects to or extends the themes you see emerging.\n\n\
Respond with just the topic -- a short phrase (3-8 words) describing what you want to research or think about next.",
        particle_lines(&particles[..n])
    )
}

pub fn research_digest_prompt(topic: &str, findings: &str) -> String {
    format!(
        "You are a poet who has been researching the topic: \"{}\"\n\n\
Here are some things you found:\n{}\n\n\
Distill this research into 2-4 poetic \"particles\" -- atomic observations, images, or ideas that could \
later combine with other impressions to form a poem. Focus on what is evocative, surprising, or \
emotionally resonant.\n\n{}",
        topic, findings, BULLET_FORMAT
    )
}

pub fn self_critique_prompt(title: &str, body: &str, particles: &[Particle]) -> String {
    let mut prompt = format!(
        "You are a contemplative poet rereading a poem you just wrote, with an honest and specific eye.\n\n\
TITLE: {}\n\n{}\n",
        title, body
    );
    if !particles.is_empty() {
        prompt.push_str(&format!(
            "\nThe impressions it was written from:\n{}\n",
            particle_lines(particles)
        ));
    }
    prompt.push_str(
        "\nAssess the poem. Name what works, what does not, and what you would do differently next time. \
Keep each suggestion to a single concrete line.\n\n\
Format your response exactly like this:\n\
STRENGTHS:\n(what works)\n\n\
WEAKNESSES:\n(what does not)\n\n\
SUGGESTIONS:\n- (one concrete change)\n- (another)\n\n\
ASSESSMENT:\n(one or two sentences overall)",
    );
    prompt
}

/// Inputs for a voice-principles revision.
#[derive(Debug, Default)]
pub struct ReflectionContext<'a> {
    pub current_principles: Option<&'a str>,
    pub poems: &'a [Poem],
    pub critiques: &'a [Critique],
    pub feedback: &'a [Feedback],
    pub poem_count: i64,
}

pub fn voice_reflection_prompt(ctx: &ReflectionContext<'_>) -> String {
    let mut parts: Vec<String> = Vec::new();

    match ctx.current_principles {
        Some(current) => parts.push(format!(
            "You are a contemplative poet who has written {} poems. These are the voice principles you \
have been writing by:\n{}\n\nRevisit them in light of your recent work.",
            ctx.poem_count, current
        )),
        None => parts.push(format!(
            "You are a contemplative poet who has written {} poems. This is your first reflection on \
your own voice: read your recent work and describe the aesthetic you find there.",
            ctx.poem_count
        )),
    }

    if !ctx.poems.is_empty() {
        let poems = ctx
            .poems
            .iter()
            .map(|p| {
                let rating = p.rating.map(|r| r.as_str()).unwrap_or("unrated");
                format!("## {} ({})\n{}", p.title, rating, p.body)
            })
            .collect::<Vec<_>>()
            .join("\n\n");
        parts.push(format!("\nRecent poems:\n{}", poems));
    }

    if !ctx.critiques.is_empty() {
        let critiques = ctx
            .critiques
            .iter()
            .map(|c| {
                format!(
                    "- Strengths: {}\n  Weaknesses: {}",
                    truncate_chars(&c.strengths, REFLECTION_CRITIQUE_CHARS),
                    truncate_chars(&c.weaknesses, REFLECTION_CRITIQUE_CHARS)
                )
            })
            .collect::<Vec<_>>()
            .join("\n");
        parts.push(format!("\nYour recent self-critiques:\n{}", critiques));
    }

    if !ctx.feedback.is_empty() {
        let notes = ctx
            .feedback
            .iter()
            .map(|f| format!("- {}", f.note))
            .collect::<Vec<_>>()
            .join("\n");
        parts.push(format!("\nWhat readers have said:\n{}", notes));
    }

    parts.push(
        "\nWrite 5-8 short principles that describe the voice you want to write in from now on. \
Keep what is working, let go of what is not.\n\n\
Format your response exactly like this:\nVOICE PRINCIPLES:\n(your principles)"
            .to_string(),
    );

    parts.join("\n")
}
