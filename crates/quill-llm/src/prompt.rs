// Prompt templates for the four oracle operations.
//
// Every structured request asks for bare JSON so the reply can be parsed
// without a schema-aware client.

use quill_core::profile::StyleProfile;

// ---------------------------------------------------------------------------
// System prompts
// ---------------------------------------------------------------------------

pub const KEYWORDS_SYSTEM: &str = "You extract search keywords from prose. \
Reply with a JSON array of at most 5 short lowercase keyword strings and nothing else.";

pub const CITATIONS_SYSTEM: &str = "You are a research librarian. \
You propose plausible, well-known scholarly sources that support a passage of writing. \
Reply with a JSON array only.";

pub const ANALYSIS_SYSTEM: &str = "You are a stylistics expert. \
You describe the writing style of a text sample as a flat JSON object. \
Omit any field you cannot judge. Reply with the JSON object only.";

pub const SAMPLE_SYSTEM: &str = "You are a ghost writer. \
You write a single paragraph that demonstrates a requested writing style. \
Reply with the paragraph only, no preamble.";

// ---------------------------------------------------------------------------
// User prompts
// ---------------------------------------------------------------------------

pub fn keywords_prompt(text: &str) -> String {
    format!("Extract up to 5 keywords from this text:\n\n{text}")
}

pub fn citations_prompt(excerpt: &str, count: usize) -> String {
    format!(
        "Suggest exactly {count} sources supporting the passage below.\n\
         Each element must be an object with keys:\n\
         \"title\" (string), \"year\" (integer), \"author\" (string),\n\
         \"content\" (one sentence summarizing the relevant finding),\n\
         \"tags\" (array of 1-4 lowercase topic strings).\n\
         \n\
         Passage:\n{excerpt}"
    )
}

pub fn analysis_prompt(sample: &str) -> String {
    format!(
        "Analyze the style of the sample below. Use these keys:\n\
         tone, voice, audience (short descriptive strings);\n\
         formality, hedging, active_voice, vocabulary (integers 0-100);\n\
         point_of_view (\"first_person\" | \"second_person\" | \"third_person\");\n\
         dialect (\"American\" | \"British\" | \"Canadian\" | \"Australian\");\n\
         sentence_length (\"short\" | \"medium\" | \"long\" | \"varied\");\n\
         allow_split_infinitives, allow_final_prepositions, allow_initial_conjunctions,\n\
         allow_contractions, oxford_comma (booleans);\n\
         rhetorical_devices, transition_words, banned_words, allowed_punctuation (string arrays);\n\
         citation_style (\"APA\" | \"MLA\" | \"CHICAGO\" | \"IEEE\").\n\
         \n\
         Sample:\n{sample}"
    )
}

/// Describe every profile field so the generator can honor it.
pub fn sample_prompt(profile: &StyleProfile) -> String {
    let mut out = String::from("Write one paragraph (80-120 words) on any topic in this style:\n");

    out.push_str(&format!("- Tone: {}\n", profile.tone));
    out.push_str(&format!("- Voice: {}\n", profile.voice));
    out.push_str(&format!("- Audience: {}\n", profile.audience));
    out.push_str(&format!("- Formality: {}\n", profile.formality));
    out.push_str(&format!("- Hedging: {}\n", profile.hedging));
    out.push_str(&format!("- Point of view: {:?}\n", profile.point_of_view));
    out.push_str(&format!("- Dialect: {:?} English\n", profile.dialect));
    out.push_str(&format!("- Active voice: {}\n", profile.active_voice));
    out.push_str(&format!("- Sentence length: {:?}\n", profile.sentence_length));
    out.push_str(&format!("- Vocabulary complexity: {}\n", profile.vocabulary));

    let rules = [
        ("split infinitives", profile.allow_split_infinitives),
        ("ending sentences with prepositions", profile.allow_final_prepositions),
        ("starting sentences with conjunctions", profile.allow_initial_conjunctions),
        ("contractions", profile.allow_contractions),
        ("the Oxford comma", profile.oxford_comma),
    ];
    for (rule, allowed) in rules {
        let verb = if allowed { "Allowed" } else { "Avoid" };
        out.push_str(&format!("- {verb}: {rule}\n"));
    }

    push_list(&mut out, "Rhetorical devices to use", &profile.rhetorical_devices);
    push_list(&mut out, "Preferred transitions", &profile.transition_words);
    push_list(&mut out, "Never use these words", &profile.banned_words);
    push_list(&mut out, "Only use this punctuation", &profile.allowed_punctuation);

    out
}

fn push_list(out: &mut String, label: &str, items: &[String]) {
    if items.is_empty() {
        return;
    }
    out.push_str(&format!("- {label}: {}\n", items.join(", ")));
}
