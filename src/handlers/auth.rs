use axum::{
    Form,
    extract::State,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::CookieJar;

use crate::{
    AppState,
    auth::{self, AdminUser, AuthUser},
    error::{AppError, StoreError},
    flash::{self, Flash},
    models::{ChangePasswordForm, LoginForm, NewUser, RegisterForm},
    password,
    views::{self, ChangePasswordPage, Layout, LoginPage, RegisterPage, WelcomePage},
};

const INVALID_CREDENTIALS: &str = "Invalid email or password.";
const DUPLICATE_EMAIL: &str = "A user with that email already exists.";

/// home
///
/// GET / sends signed-in users to the landing page and everyone else to the
/// login form.
pub async fn home(State(state): State<AppState>, jar: CookieJar) -> Redirect {
    match auth::read_session(&jar, &state.config) {
        Some(_) => Redirect::to("/welcome"),
        None => Redirect::to("/login"),
    }
}

/// GET /login
pub async fn login_form(
    State(state): State<AppState>,
    jar: CookieJar,
) -> Result<Response, AppError> {
    if auth::read_session(&jar, &state.config).is_some() {
        return Ok(Redirect::to("/welcome").into_response());
    }

    let (jar, layout) = Layout::take(jar, None);
    let page = LoginPage {
        layout,
        email: String::new(),
    };
    Ok((jar, views::render(&page)?).into_response())
}

/// login
///
/// POST /login. An unknown email and a wrong password produce the same generic
/// message and the form is redisplayed without touching the session.
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    Form(form): Form<LoginForm>,
) -> Result<Response, AppError> {
    let user = state.repo.find_user_by_email(&form.email).await?;

    let verified = match &user {
        Some(user) => password::verify_password(&form.password, &user.password_hash).await?,
        None => false,
    };

    match user {
        Some(user) if verified => {
            let jar = auth::issue_session(jar, &state.config, &user.email, &user.name)?;
            tracing::info!(email = %user.email, "user logged in");
            Ok(flash::redirect(
                jar,
                Flash::success(format!("Welcome back, {}.", user.name)),
                "/welcome",
            )
            .into_response())
        }
        _ => {
            tracing::warn!(email = %form.email, "rejected login attempt");
            let page = LoginPage {
                layout: Layout::with_flash(None, Flash::error(INVALID_CREDENTIALS)),
                email: form.email,
            };
            Ok(views::render(&page)?.into_response())
        }
    }
}

/// logout
///
/// GET or POST /logout. Clears the session whether or not one was present.
pub async fn logout(jar: CookieJar) -> Response {
    let jar = auth::clear_session(jar);
    flash::redirect(jar, Flash::info("You have been logged out."), "/login").into_response()
}

/// GET /welcome
pub async fn welcome(user: AuthUser, jar: CookieJar) -> Result<Response, AppError> {
    let name = user.name.clone();
    let is_admin = user.is_admin();

    let (jar, layout) = Layout::take(jar, Some(user));
    let page = WelcomePage {
        layout,
        name,
        is_admin,
    };
    Ok((jar, views::render(&page)?).into_response())
}

/// GET /register (admin only)
pub async fn register_form(
    AdminUser(user): AdminUser,
    jar: CookieJar,
) -> Result<Response, AppError> {
    let (jar, layout) = Layout::take(jar, Some(user));
    let page = RegisterPage {
        layout,
        name: String::new(),
        email: String::new(),
    };
    Ok((jar, views::render(&page)?).into_response())
}

/// register
///
/// POST /register (admin only). Rejects an email that already has an account,
/// otherwise stores a bcrypt hash of the submitted password. The store's unique
/// constraint catches a concurrent registration of the same email.
pub async fn register(
    AdminUser(admin): AdminUser,
    State(state): State<AppState>,
    jar: CookieJar,
    Form(form): Form<RegisterForm>,
) -> Result<Response, AppError> {
    if state.repo.find_user_by_email(&form.email).await?.is_some() {
        tracing::warn!(email = %form.email, "registration refused: email taken");
        return duplicate_registration(admin, form);
    }

    let password_hash =
        password::hash_password(&form.password, state.config.password_cost).await?;
    let new_user = NewUser {
        name: form.name.clone(),
        email: form.email.clone(),
        password_hash,
    };

    match state.repo.create_user(new_user).await {
        Ok(user) => {
            tracing::info!(email = %user.email, by = %admin.email, "user registered");
            Ok(flash::redirect(
                jar,
                Flash::success(format!("User {} registered.", user.name)),
                "/welcome",
            )
            .into_response())
        }
        Err(StoreError::Conflict(reason)) => {
            tracing::warn!(email = %form.email, %reason, "registration refused by store");
            duplicate_registration(admin, form)
        }
        Err(e) => Err(e.into()),
    }
}

fn duplicate_registration(admin: AuthUser, form: RegisterForm) -> Result<Response, AppError> {
    let page = RegisterPage {
        layout: Layout::with_flash(Some(admin), Flash::error(DUPLICATE_EMAIL)),
        name: form.name,
        email: form.email,
    };
    Ok(views::render(&page)?.into_response())
}

/// GET /change_password
pub async fn change_password_form(user: AuthUser, jar: CookieJar) -> Result<Response, AppError> {
    let (jar, layout) = Layout::take(jar, Some(user));
    let page = ChangePasswordPage { layout };
    Ok((jar, views::render(&page)?).into_response())
}

/// change_password
///
/// POST /change_password. Overwrites the stored hash of the signed-in account
/// only; the session itself stays valid.
pub async fn change_password(
    user: AuthUser,
    State(state): State<AppState>,
    jar: CookieJar,
    Form(form): Form<ChangePasswordForm>,
) -> Result<Response, AppError> {
    let password_hash =
        password::hash_password(&form.new_password, state.config.password_cost).await?;

    if !state.repo.update_password(&user.email, &password_hash).await? {
        tracing::warn!(email = %user.email, "password change for a session without a user row");
        return Ok(flash::redirect(
            jar,
            Flash::error("Your account could not be found."),
            "/welcome",
        )
        .into_response());
    }

    tracing::info!(email = %user.email, "password changed");
    Ok(flash::redirect(jar, Flash::success("Password updated."), "/welcome").into_response())
}
