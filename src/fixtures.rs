//! Canned payloads for the move, opening and position endpoints. No engine
//! or opening book sits behind them; the frontend only needs the shapes.

use serde_json::{json, Value};

pub fn move_suggestions() -> Value {
    json!({
        "moves": [
            {"san": "e4", "evaluation": 0.32, "probability": 0.28, "description": "King's Pawn Opening"},
            {"san": "d4", "evaluation": 0.29, "probability": 0.25, "description": "Queen's Pawn Opening"},
            {"san": "Nf3", "evaluation": 0.18, "probability": 0.15, "description": "Réti Opening"},
            {"san": "c4", "evaluation": 0.15, "probability": 0.12, "description": "English Opening"}
        ],
        "position": {
            "evaluation": 0.0,
            "bestLine": "e4 e5 Nf3 Nc6 Bb5",
            "material": "Equal",
            "control": "Center control balanced"
        }
    })
}

pub fn opening_identification() -> Value {
    json!({
        "name": "Ruy Lopez (Spanish Opening)",
        "eco": "C60",
        "popularity": 85,
        "winRate": {"white": 38, "draw": 35, "black": 27},
        "mainLine": "1. e4 e5 2. Nf3 Nc6 3. Bb5",
        "variations": [
            {"name": "Berlin Defense", "moves": "3... Nf6"},
            {"name": "Morphy Defense", "moves": "3... a6"},
            {"name": "Classical Defense", "moves": "3... Bc5"}
        ],
        "description": "The Ruy Lopez is one of the oldest and most classic of all openings.",
        "strategy": {
            "white": "White aims to put pressure on the e5 pawn.",
            "black": "Black typically defends the e5 pawn."
        }
    })
}

pub fn position_analysis() -> Value {
    json!({
        "evaluation": 0.32,
        "material": {"white": 39, "black": 39, "advantage": "Equal"},
        "position": {
            "center": "White has slight center control",
            "kingsSafety": {"white": "Safe", "black": "Safe"},
            "activity": "White pieces slightly more active",
            "space": "Equal space control"
        },
        "bestMoves": [
            {"move": "e4", "evaluation": 0.32, "description": "Controls center"},
            {"move": "d4", "evaluation": 0.29, "description": "Opens diagonal for queen and bishop"},
            {"move": "Nf3", "evaluation": 0.18, "description": "Develops knight"}
        ],
        "threats": ["Black threatens to capture on e4"],
        "weaknesses": ["White's pawn on d4 is weak"]
    })
}
