use std::collections::BTreeMap;

use chrono::Utc;
use sea_orm::sea_query::{Expr, ExprTrait, Func};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait,
    QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
    prelude::DateTimeWithTimeZone,
};
use serde::Serialize;
use uuid::Uuid;

use super::entities::prelude::Todo;
use super::entities::{Category, Priority, todo};

/// Conjunctive listing filters; `None` imposes no constraint.
#[derive(Debug, Default, Clone)]
pub struct TodoFilter {
    pub category: Option<Category>,
    pub priority: Option<Priority>,
    pub completed: Option<bool>,
    pub search: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewTodo {
    pub title: String,
    pub description: Option<String>,
    pub priority: Priority,
    pub category: Category,
    pub due_date: Option<DateTimeWithTimeZone>,
}

/// Sparse patch: `None` leaves the field untouched.
#[derive(Debug, Default, Clone)]
pub struct TodoPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub completed: Option<bool>,
    pub priority: Option<Priority>,
    pub category: Option<Category>,
    pub due_date: Option<DateTimeWithTimeZone>,
}

#[derive(Debug, Serialize)]
pub struct TodoStats {
    pub total: u64,
    pub completed: u64,
    pub active: u64,
    pub overdue: u64,
    pub due_today: u64,
    pub by_priority: BTreeMap<Priority, u64>,
    pub by_category: BTreeMap<Category, u64>,
}

pub async fn list_todos(
    db: &DatabaseConnection,
    owner_id: &Uuid,
    skip: u64,
    limit: u64,
    filter: &TodoFilter,
) -> Result<Vec<todo::Model>, sea_orm::DbErr> {
    let mut query = Todo::find().filter(todo::Column::OwnerId.eq(*owner_id));

    if let Some(category) = filter.category {
        query = query.filter(todo::Column::Category.eq(category.as_str()));
    }
    if let Some(priority) = filter.priority {
        query = query.filter(todo::Column::Priority.eq(priority.as_str()));
    }
    if let Some(completed) = filter.completed {
        query = query.filter(todo::Column::Completed.eq(completed));
    }
    if let Some(search) = &filter.search {
        let pattern = format!("%{}%", search.to_lowercase());
        query = query.filter(
            Condition::any()
                .add(Expr::expr(Func::lower(Expr::col(todo::Column::Title))).like(pattern.clone()))
                .add(Expr::expr(Func::lower(Expr::col(todo::Column::Description))).like(pattern)),
        );
    }

    query
        .order_by_desc(todo::Column::CreatedAt)
        .offset(skip)
        .limit(limit)
        .all(db)
        .await
}

/// Owner scoping doubles as the authorization check: a todo owned by someone
/// else is indistinguishable from a nonexistent id.
pub async fn find_by_id(
    db: &DatabaseConnection,
    todo_id: &Uuid,
    owner_id: &Uuid,
) -> Result<Option<todo::Model>, sea_orm::DbErr> {
    Todo::find()
        .filter(todo::Column::Id.eq(*todo_id))
        .filter(todo::Column::OwnerId.eq(*owner_id))
        .one(db)
        .await
}

pub async fn create_todo(
    db: &DatabaseConnection,
    owner_id: &Uuid,
    new: NewTodo,
) -> Result<todo::Model, sea_orm::DbErr> {
    let now = Utc::now().fixed_offset();
    let model = todo::ActiveModel {
        id: Set(Uuid::new_v4()),
        owner_id: Set(*owner_id),
        title: Set(new.title),
        description: Set(new.description),
        completed: Set(false),
        priority: Set(new.priority.as_str().to_string()),
        category: Set(new.category.as_str().to_string()),
        due_date: Set(new.due_date),
        created_at: Set(now),
        updated_at: Set(now),
        completed_at: Set(None),
        ..Default::default()
    };
    model.insert(db).await
}

pub async fn update_todo(
    db: &DatabaseConnection,
    todo_id: &Uuid,
    owner_id: &Uuid,
    patch: TodoPatch,
) -> Result<Option<todo::Model>, sea_orm::DbErr> {
    // Read-then-write: the completed/completed_at coupling must be atomic.
    let txn = db.begin().await?;

    let Some(existing) = Todo::find()
        .filter(todo::Column::Id.eq(*todo_id))
        .filter(todo::Column::OwnerId.eq(*owner_id))
        .one(&txn)
        .await?
    else {
        txn.rollback().await?;
        return Ok(None);
    };

    let was_completed = existing.completed;
    let now = Utc::now().fixed_offset();
    let mut active: todo::ActiveModel = existing.into();

    if let Some(title) = patch.title {
        active.title = Set(title);
    }
    if let Some(description) = patch.description {
        active.description = Set(Some(description));
    }
    if let Some(priority) = patch.priority {
        active.priority = Set(priority.as_str().to_string());
    }
    if let Some(category) = patch.category {
        active.category = Set(category.as_str().to_string());
    }
    if let Some(due_date) = patch.due_date {
        active.due_date = Set(Some(due_date));
    }
    if let Some(completed) = patch.completed {
        if completed != was_completed {
            active.completed = Set(completed);
            active.completed_at = Set(completed.then_some(now));
        }
    }
    active.updated_at = Set(now);

    let updated = active.update(&txn).await?;
    txn.commit().await?;
    Ok(Some(updated))
}

pub async fn delete_todo(
    db: &DatabaseConnection,
    todo_id: &Uuid,
    owner_id: &Uuid,
) -> Result<bool, sea_orm::DbErr> {
    let result = Todo::delete_many()
        .filter(todo::Column::Id.eq(*todo_id))
        .filter(todo::Column::OwnerId.eq(*owner_id))
        .exec(db)
        .await?;
    Ok(result.rows_affected > 0)
}

/// One owner-scoped fetch, folded in memory. The breakdowns are seeded over
/// the full enum domain so absent values still appear as zero.
pub async fn stats(db: &DatabaseConnection, owner_id: &Uuid) -> Result<TodoStats, sea_orm::DbErr> {
    let todos = Todo::find()
        .filter(todo::Column::OwnerId.eq(*owner_id))
        .all(db)
        .await?;

    let today = Utc::now().date_naive();
    let mut by_priority: BTreeMap<Priority, u64> =
        Priority::ALL.iter().map(|p| (*p, 0)).collect();
    let mut by_category: BTreeMap<Category, u64> =
        Category::ALL.iter().map(|c| (*c, 0)).collect();

    let mut completed = 0u64;
    let mut overdue = 0u64;
    let mut due_today = 0u64;

    for item in &todos {
        if item.completed {
            completed += 1;
        }
        if let Some(due) = item.due_date {
            if !item.completed {
                let due_day = due.date_naive();
                if due_day < today {
                    overdue += 1;
                } else if due_day == today {
                    due_today += 1;
                }
            }
        }
        if let Ok(priority) = Priority::try_from(item.priority.as_str()) {
            *by_priority.entry(priority).or_default() += 1;
        }
        if let Ok(category) = Category::try_from(item.category.as_str()) {
            *by_category.entry(category).or_default() += 1;
        }
    }

    let total = todos.len() as u64;
    Ok(TodoStats {
        total,
        completed,
        active: total - completed,
        overdue,
        due_today,
        by_priority,
        by_category,
    })
}
