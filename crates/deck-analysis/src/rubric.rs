//! Scoring rubric and prompt construction.
//!
//! The rubric table is static configuration; prompts are pure string builders
//! over it and the slide list.

use crate::model::{DimensionKey, Grade, Slide};

/// One row of the scoring taxonomy.
#[derive(Debug, Clone, Copy)]
pub struct DimensionDefinition {
    pub key: DimensionKey,
    pub label: &'static str,
    pub description: &'static str,
    /// Anchor points for scores 10 / 7 / 4 / 1.
    pub criteria: &'static str,
}

/// The 12 dimensions in canonical order (same order as [`DimensionKey::ALL`]).
pub const DIMENSIONS: [DimensionDefinition; 12] = [
    DimensionDefinition {
        key: DimensionKey::Problem,
        label: "Problem Statement",
        description: "Clarity and urgency of the problem being solved",
        criteria: "10: Problem is specific, quantified, deeply felt by a large market. 7: Clear problem but lacks urgency or quantification. 4: Vague or generic problem. 1: No discernible problem statement.",
    },
    DimensionDefinition {
        key: DimensionKey::Solution,
        label: "Solution",
        description: "How well the solution addresses the problem and its differentiation",
        criteria: "10: Elegant, defensible solution with clear differentiation. 7: Solid solution but differentiation unclear. 4: Generic solution, easily replicated. 1: Solution not presented or doesn't address the problem.",
    },
    DimensionDefinition {
        key: DimensionKey::MarketSize,
        label: "Market Size (TAM/SAM/SOM)",
        description: "Credibility and size of the addressable market",
        criteria: "10: Bottom-up TAM/SAM/SOM with credible sources, large market. 7: Market sizing present but top-down only. 4: Vague market claims without data. 1: No market sizing.",
    },
    DimensionDefinition {
        key: DimensionKey::BusinessModel,
        label: "Business Model",
        description: "Revenue model clarity and scalability",
        criteria: "10: Clear unit economics, multiple revenue streams, proven scalability. 7: Clear model but unit economics unproven. 4: Vague monetization strategy. 1: No business model presented.",
    },
    DimensionDefinition {
        key: DimensionKey::Traction,
        label: "Traction & Metrics",
        description: "Evidence of product-market fit and growth",
        criteria: "10: Strong revenue/user growth with clear trends, key metrics shown. 7: Some traction but early stage or inconsistent. 4: Minimal traction, mostly vanity metrics. 1: No traction data.",
    },
    DimensionDefinition {
        key: DimensionKey::Team,
        label: "Team",
        description: "Team credibility, relevant experience, and completeness",
        criteria: "10: Experienced founders with domain expertise, complete team, notable advisors. 7: Solid team but gaps in experience or key roles. 4: Team slide present but lacks credibility signals. 1: No team information.",
    },
    DimensionDefinition {
        key: DimensionKey::Competition,
        label: "Competitive Landscape",
        description: "Honesty and depth of competitive analysis",
        criteria: "10: Comprehensive competitive matrix with honest positioning and clear moat. 7: Competitors listed with some differentiation. 4: \"No competition\" claim or superficial analysis. 1: No competitive analysis.",
    },
    DimensionDefinition {
        key: DimensionKey::GoToMarket,
        label: "Go-to-Market Strategy",
        description: "Customer acquisition plan and channel strategy",
        criteria: "10: Specific channels, CAC targets, partnership strategy, phased rollout. 7: General GTM strategy but lacks specifics. 4: Vague \"we'll use social media\" type plans. 1: No GTM strategy.",
    },
    DimensionDefinition {
        key: DimensionKey::Financials,
        label: "Financial Projections",
        description: "Realism and detail of financial forecasts",
        criteria: "10: 3-5 year projections with clear assumptions, path to profitability. 7: Projections present but assumptions unclear. 4: Hockey-stick projections without basis. 1: No financial projections.",
    },
    DimensionDefinition {
        key: DimensionKey::Ask,
        label: "The Ask & Use of Funds",
        description: "Clarity of funding request and capital allocation",
        criteria: "10: Specific amount, detailed use of funds, clear milestones tied to raise. 7: Amount stated but use of funds vague. 4: Ask present but no justification. 1: No ask or use of funds.",
    },
    DimensionDefinition {
        key: DimensionKey::Storytelling,
        label: "Storytelling & Narrative",
        description: "Overall narrative flow and emotional engagement",
        criteria: "10: Compelling narrative arc, emotional hook, memorable. 7: Logical flow but lacks emotional engagement. 4: Disjointed narrative. 1: No clear narrative structure.",
    },
    DimensionDefinition {
        key: DimensionKey::DesignClarity,
        label: "Design & Visual Clarity",
        description: "Visual quality, readability, and professional presentation",
        criteria: "10: Professional design, clear data visualization, consistent branding. 7: Clean but unremarkable design. 4: Cluttered or inconsistent design. 1: Difficult to read, poor formatting.",
    },
];

pub fn definition(key: DimensionKey) -> &'static DimensionDefinition {
    // DIMENSIONS is indexed in DimensionKey::ALL order.
    &DIMENSIONS[key as usize]
}

const PERSONA: &str = "You are an elite VC pitch deck analyst with 20+ years of experience evaluating startup pitch decks for top-tier venture capital firms. You combine rigorous analytical frameworks with pattern recognition from having reviewed thousands of decks.";

const INSTRUCTIONS: &str = "1. Score each of the 12 dimensions from 0-10 with specific feedback
2. Calculate deckQualityScore (0-100) as a weighted score across all dimensions
3. Calculate tractionScore (0-100) specifically for traction/metrics strength
4. Assign an overall grade (A+ through F)
5. Extract any quantitative metrics mentioned (revenue, users, growth, funding ask, etc.). Use null for any metric not stated in the deck; never estimate
6. Classify each slide by type and provide a brief summary
7. List specific strengths, weaknesses, red flags, and priority improvements";

const RESPONSE_TAIL: &str = r#"  "strengths": ["Specific strength 1", "Specific strength 2"],
  "weaknesses": ["Specific weakness 1", "Specific weakness 2"],
  "redFlags": ["Red flag 1 if any"],
  "priorityImprovements": [
    { "title": "Improvement title", "description": "Detailed actionable advice", "impact": "high" }
  ],
  "extractedMetrics": {
    "revenue": "$500K ARR" or null,
    "arr": "$500K" or null,
    "growthRate": "20% MoM" or null,
    "users": "10,000 MAU" or null,
    "fundingAsk": "$2M Seed" or null,
    "burnRate": "$50K/mo" or null,
    "cac": "$25" or null,
    "ltv": "$500" or null,
    "teamSize": "8" or null,
    "runway": "18 months" or null
  },
  "slideBreakdown": [
    { "slideNumber": 1, "classifiedType": "Title/Cover", "summary": "Company name and tagline" }
  ],
  "summary": "2-3 sentence executive summary of the deck quality",
  "deckQualityScore": 72,
  "tractionScore": 45,
  "grade": "B-"
}"#;

/// Build the system instruction: persona, dimension definitions, grading scale
/// and the required JSON shape.
pub fn build_system_prompt() -> String {
    let dimensions = DIMENSIONS
        .iter()
        .map(|d| {
            format!(
                "- **{}** ({}): {}\n  Scoring: {}",
                d.key, d.label, d.description, d.criteria
            )
        })
        .collect::<Vec<_>>()
        .join("\n");

    let grading = Grade::ALL
        .iter()
        .map(|g| {
            format!(
                "- {:<2} ({}-{}): {}",
                g.as_str(),
                g.min_score(),
                g.max_score(),
                g.description()
            )
        })
        .collect::<Vec<_>>()
        .join("\n");

    let example_dimensions = DIMENSIONS
        .iter()
        .map(|d| {
            format!(
                "    {{ \"key\": \"{}\", \"label\": \"{}\", \"score\": 5, \"feedback\": \"...\" }}",
                d.key, d.label
            )
        })
        .collect::<Vec<_>>()
        .join(",\n");

    format!(
        "{PERSONA}

Your task is to perform a comprehensive 12-dimension analysis of the provided pitch deck content.

## Scoring Dimensions

{dimensions}

## Grading Scale

Based on the weighted average of all dimension scores (each 0-10):
{grading}

## Instructions

{INSTRUCTIONS}

## Response Format

You MUST respond with valid JSON only. No text before or after the JSON. Use this exact structure:

{{
  \"dimensions\": [
{example_dimensions}
  ],
{RESPONSE_TAIL}"
    )
}

/// Build the user message: one labeled block per slide, in slide order.
pub fn build_user_prompt(slides: &[Slide]) -> String {
    let blocks = slides
        .iter()
        .map(|s| {
            format!(
                "=== SLIDE {} ({} words) ===\n{}",
                s.slide_number, s.word_count, s.raw_text
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n");

    format!(
        "Please analyze the following pitch deck ({} slides):\n\n{}\n\nRespond with the JSON analysis only.",
        slides.len(),
        blocks
    )
}
